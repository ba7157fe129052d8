use serde::{Deserialize, Serialize};

use super::moving_average::ema;

/// MACD parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

/// DIF, DEA and histogram lines, each as long as the input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdSeries {
    pub dif: Vec<Option<f64>>,
    pub dea: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Computes MACD.
///
/// DIF is defined where both EMAs are. DEA is the signal-period EMA over the
/// defined part of DIF, mapped back onto the input indices. The histogram is
/// `2 * (DIF - DEA)` where both exist.
pub fn macd(values: &[f64], params: MacdParams) -> MacdSeries {
    let fast = ema(values, params.fast);
    let slow = ema(values, params.slow);

    let dif: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let mut dea = vec![None; values.len()];
    if let Some(offset) = dif.iter().position(Option::is_some) {
        let compact: Vec<f64> = dif[offset..].iter().map(|v| v.unwrap_or(0.0)).collect();
        for (i, value) in ema(&compact, params.signal).into_iter().enumerate() {
            dea[offset + i] = value;
        }
    }

    let histogram = dif
        .iter()
        .zip(&dea)
        .map(|(d, e)| match (d, e) {
            (Some(d), Some(e)) => Some((d - e) * 2.0),
            _ => None,
        })
        .collect();

    MacdSeries {
        dif,
        dea,
        histogram,
    }
}
