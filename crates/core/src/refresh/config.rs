//! Orchestrator configuration.

use std::time::Duration;

use stockpulse_market_data::{IndicatorKind, KlinePeriod, MacdParams};

use crate::errors::{Error, Result};

/// Default refresh period for tracked symbols.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Default number of bars requested per refresh.
pub const DEFAULT_KLINE_COUNT: usize = 120;

/// Upper bound on bars requested per refresh.
pub const MAX_KLINE_COUNT: usize = 1000;

/// Which indicators are computed over each kline series.
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorConfig {
    pub sma: Vec<usize>,
    pub ema: Vec<usize>,
    pub rsi: Vec<usize>,
    pub macd: Option<MacdParams>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma: vec![5, 10, 20, 60],
            ema: vec![12, 26],
            rsi: vec![14],
            macd: Some(MacdParams::default()),
        }
    }
}

impl IndicatorConfig {
    /// Single-line indicators in output order.
    pub fn kinds(&self) -> Vec<IndicatorKind> {
        self.sma
            .iter()
            .map(|&n| IndicatorKind::Sma(n))
            .chain(self.ema.iter().map(|&n| IndicatorKind::Ema(n)))
            .chain(self.rsi.iter().map(|&n| IndicatorKind::Rsi(n)))
            .collect()
    }
}

/// Settings for [`FetchOrchestrator`](super::FetchOrchestrator).
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub refresh_period: Duration,
    pub kline_period: KlinePeriod,
    pub kline_count: usize,
    pub fetch_ticks: bool,
    pub fetch_order_book: bool,
    pub indicators: IndicatorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            refresh_period: DEFAULT_REFRESH_PERIOD,
            kline_period: KlinePeriod::Daily,
            kline_count: DEFAULT_KLINE_COUNT,
            fetch_ticks: true,
            fetch_order_book: true,
            indicators: IndicatorConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Rejects settings the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_period.is_zero() {
            return Err(Error::InvalidConfigValue(
                "refresh period must be greater than zero".to_string(),
            ));
        }
        if self.kline_count == 0 || self.kline_count > MAX_KLINE_COUNT {
            return Err(Error::InvalidConfigValue(format!(
                "kline count must be between 1 and {}, got {}",
                MAX_KLINE_COUNT, self.kline_count
            )));
        }
        let zero_period = self
            .indicators
            .kinds()
            .into_iter()
            .any(|kind| {
                matches!(
                    kind,
                    IndicatorKind::Sma(0) | IndicatorKind::Ema(0) | IndicatorKind::Rsi(0)
                )
            });
        if zero_period {
            return Err(Error::InvalidConfigValue(
                "indicator periods must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
