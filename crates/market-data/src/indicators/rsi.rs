/// Relative strength index over `period` price deltas.
///
/// Gains and losses are summed over the trailing `period` deltas, so index
/// `i` is defined from `i = period`. A zero loss sum yields exactly 100.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let deltas: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    for i in period..values.len() {
        // deltas[j] is values[j + 1] - values[j]
        let window = &deltas[i - period..i];
        let gain: f64 = window.iter().filter(|d| **d > 0.0).sum();
        let loss: f64 = window.iter().filter(|d| **d < 0.0).map(|d| -d).sum();

        out[i] = Some(if loss == 0.0 {
            100.0
        } else {
            let rs = gain / loss;
            100.0 - 100.0 / (1.0 + rs)
        });
    }
    out
}
