//! Merged per-symbol snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockpulse_market_data::indicators::macd;
use stockpulse_market_data::models::closes;
use stockpulse_market_data::{IndicatorSeries, KlineBar, MacdSeries, OrderBook, Quote, TickPoint};

use super::config::IndicatorConfig;

/// Indicators computed over the closing prices of a kline series.
///
/// Every series is aligned 1:1 with the klines it was computed from.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSet {
    pub series: Vec<IndicatorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdSeries>,
}

impl IndicatorSet {
    pub fn compute(bars: &[KlineBar], config: &IndicatorConfig) -> Self {
        let values = closes(bars);
        Self {
            series: config
                .kinds()
                .iter()
                .map(|kind| kind.compute(&values))
                .collect(),
            macd: config.macd.map(|params| macd(&values, params)),
        }
    }

    /// Series with the given label, e.g. `RSI14`.
    pub fn get(&self, label: &str) -> Option<&IndicatorSeries> {
        self.series.iter().find(|s| s.kind.label() == label)
    }
}

/// Everything known about one symbol after a successful refresh.
///
/// Built in full before it is published; consumers only ever see a
/// complete snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub quote: Quote,
    pub klines: Option<Vec<KlineBar>>,
    pub ticks: Option<Vec<TickPoint>>,
    pub order_book: Option<OrderBook>,
    pub indicators: Option<IndicatorSet>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Merges fetched sections and computes indicators over the klines.
    pub fn assemble(
        quote: Quote,
        klines: Option<Vec<KlineBar>>,
        ticks: Option<Vec<TickPoint>>,
        order_book: Option<OrderBook>,
        config: &IndicatorConfig,
    ) -> Self {
        let indicators = klines
            .as_deref()
            .map(|bars| IndicatorSet::compute(bars, config));
        Self {
            quote,
            klines,
            ticks,
            order_book,
            indicators,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::test_support;

    #[test]
    fn test_indicators_align_with_klines() {
        let bars = test_support::daily_bars("sh600519", &[10.0, 11.0, 12.0, 13.0, 14.0]);
        let config = IndicatorConfig {
            sma: vec![3],
            ema: vec![],
            rsi: vec![],
            macd: None,
        };
        let snapshot = MarketSnapshot::assemble(
            test_support::quote("sh600519", 14.0),
            Some(bars),
            None,
            None,
            &config,
        );

        let indicators = snapshot.indicators.unwrap();
        let sma = indicators.get("SMA3").unwrap();
        assert_eq!(sma.values, vec![None, None, Some(11.0), Some(12.0), Some(13.0)]);
        assert!(indicators.macd.is_none());
    }

    #[test]
    fn test_no_klines_means_no_indicators() {
        let snapshot = MarketSnapshot::assemble(
            test_support::quote("sz000001", 10.0),
            None,
            None,
            None,
            &IndicatorConfig::default(),
        );
        assert!(snapshot.indicators.is_none());
    }

    #[test]
    fn test_short_history_is_undefined_not_zero() {
        let bars = test_support::daily_bars("sz000001", &[10.0, 10.5]);
        let set = IndicatorSet::compute(&bars, &IndicatorConfig::default());

        let rsi = set.get("RSI14").unwrap();
        assert_eq!(rsi.values, vec![None, None]);
        let macd = set.macd.unwrap();
        assert_eq!(macd.dif.len(), 2);
        assert!(macd.histogram.iter().all(Option::is_none));
    }
}
