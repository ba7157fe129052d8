use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use log::warn;

use crate::errors::MarketDataError;

/// Candle period.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KlinePeriod {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
    Daily,
    Weekly,
    Monthly,
}

impl KlinePeriod {
    /// Bar length in minutes for intraday periods.
    pub fn minutes(self) -> Option<u32> {
        match self {
            Self::Min1 => Some(1),
            Self::Min5 => Some(5),
            Self::Min15 => Some(15),
            Self::Min30 => Some(30),
            Self::Min60 => Some(60),
            Self::Daily | Self::Weekly | Self::Monthly => None,
        }
    }

    pub fn is_intraday(self) -> bool {
        self.minutes().is_some()
    }
}

impl fmt::Display for KlinePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Min60 => "60m",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

impl FromStr for KlinePeriod {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" | "1" | "min1" => Ok(Self::Min1),
            "5m" | "5" | "min5" => Ok(Self::Min5),
            "15m" | "15" | "min15" => Ok(Self::Min15),
            "30m" | "30" | "min30" => Ok(Self::Min30),
            "60m" | "60" | "min60" => Ok(Self::Min60),
            "daily" | "day" | "1d" => Ok(Self::Daily),
            "weekly" | "week" | "1w" => Ok(Self::Weekly),
            "monthly" | "month" | "1mo" => Ok(Self::Monthly),
            other => Err(MarketDataError::ValidationFailed {
                message: format!("Unknown kline period '{}'", other),
            }),
        }
    }
}

/// One OHLCV candle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineBar {
    pub symbol: String,
    pub period: KlinePeriod,
    /// Bar open time, exchange local (Asia/Shanghai).
    pub time: NaiveDateTime,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnover_rate: Option<f64>,
}

impl KlineBar {
    /// `low <= {open, close} <= high` with finite, non-negative prices.
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.close, self.high, self.low];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return false;
        }
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }
}

/// Sorts bars ascending by time, keeps the last bar seen for each timestamp
/// and drops bars that break the OHLC bounds.
pub fn normalize_series(bars: Vec<KlineBar>) -> Vec<KlineBar> {
    let mut by_time: BTreeMap<NaiveDateTime, KlineBar> = BTreeMap::new();
    for bar in bars {
        if !bar.is_valid() {
            warn!(
                "Dropping invalid {} bar for {} at {}: o={} c={} h={} l={}",
                bar.period, bar.symbol, bar.time, bar.open, bar.close, bar.high, bar.low
            );
            continue;
        }
        by_time.insert(bar.time, bar);
    }
    by_time.into_values().collect()
}

/// Fills `change`, `change_percent` and `amplitude` from the previous bar's
/// close where the upstream did not provide them. The first bar has no
/// reference close and keeps whatever it had.
pub fn fill_derived_fields(bars: &mut [KlineBar]) {
    for i in 1..bars.len() {
        let prev_close = bars[i - 1].close;
        if prev_close <= 0.0 {
            continue;
        }
        let bar = &mut bars[i];
        if bar.change.is_none() {
            bar.change = Some(bar.close - prev_close);
        }
        if bar.change_percent.is_none() {
            bar.change_percent = Some((bar.close - prev_close) / prev_close * 100.0);
        }
        if bar.amplitude.is_none() {
            bar.amplitude = Some((bar.high - bar.low) / prev_close * 100.0);
        }
    }
}

/// Closing prices in series order.
pub fn closes(bars: &[KlineBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
