/// Simple moving average.
///
/// Index `i` holds the mean of `values[i + 1 - period..=i]` once `period`
/// values are available and `None` before that. A zero period yields an
/// all-`None` series.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = Some(window.iter().sum::<f64>() / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values, then `ema[i] = value[i] * k + ema[i - 1] * (1 - k)` with
/// `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);

    for i in period..values.len() {
        prev = values[i] * k + prev * (1.0 - k);
        out[i] = Some(prev);
    }
    out
}
