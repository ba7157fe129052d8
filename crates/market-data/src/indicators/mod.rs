//! Technical indicators.
//!
//! Pure functions over a price series. Every output has the same length as
//! its input and uses `None` wherever the lookback window is not yet
//! satisfied. Nothing here fails: short input simply yields `None`.

mod macd;
mod moving_average;
mod rsi;

pub use macd::{macd, MacdParams, MacdSeries};
pub use moving_average::{ema, sma};
pub use rsi::rsi;

use serde::{Deserialize, Serialize};

/// Which single-line indicator a series holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "period", rename_all = "camelCase")]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
}

impl IndicatorKind {
    /// Short label such as `SMA5` or `RSI14`.
    pub fn label(&self) -> String {
        match self {
            Self::Sma(n) => format!("SMA{}", n),
            Self::Ema(n) => format!("EMA{}", n),
            Self::Rsi(n) => format!("RSI{}", n),
        }
    }

    /// Computes this indicator over `values`.
    pub fn compute(&self, values: &[f64]) -> IndicatorSeries {
        let values = match *self {
            Self::Sma(n) => sma(values, n),
            Self::Ema(n) => ema(values, n),
            Self::Rsi(n) => rsi(values, n),
        };
        IndicatorSeries { kind: *self, values }
    }
}

/// Indicator values aligned 1:1 with the source series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Most recent defined value.
    pub fn latest(&self) -> Option<f64> {
        self.values.iter().rev().find_map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_dispatch() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        let series = IndicatorKind::Sma(3).compute(&closes);
        assert_eq!(series.kind.label(), "SMA3");
        assert_eq!(series.latest(), Some(13.0));
        assert_eq!(series.values.len(), closes.len());
    }

    #[test]
    fn test_latest_of_undefined_series() {
        let series = IndicatorKind::Rsi(14).compute(&[1.0, 2.0]);
        assert_eq!(series.latest(), None);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&IndicatorKind::Ema(12)).unwrap();
        assert_eq!(json, r#"{"type":"ema","period":12}"#);
    }
}
