//! Property-based integration tests for indicators and bar normalization.
//!
//! These tests verify that universal properties hold across generated price
//! series, using the `proptest` crate for random test case generation.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use stockpulse_market_data::indicators::{ema, macd, rsi, sma, MacdParams};
use stockpulse_market_data::models::normalize_series;
use stockpulse_market_data::{KlineBar, KlinePeriod};

// =============================================================================
// Generators
// =============================================================================

/// Generates a positive price series of realistic magnitude.
fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(1.0f64..5000.0, 0..=max_len)
}

/// Generates a series that only moves up.
fn arb_rising(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (1.0f64..100.0, proptest::collection::vec(0.01f64..5.0, min_len..min_len + 40)).prop_map(
        |(start, steps)| {
            let mut price = start;
            let mut out = vec![price];
            for step in steps {
                price += step;
                out.push(price);
            }
            out
        },
    )
}

/// Generates a bar that may or may not respect the OHLC bounds.
fn arb_bar() -> impl Strategy<Value = KlineBar> {
    (
        0i64..60,          // day offset, duplicates allowed
        1.0f64..100.0,     // open
        1.0f64..100.0,     // close
        1.0f64..100.0,     // high
        1.0f64..100.0,     // low
        0.0f64..1.0e7,     // volume
    )
        .prop_map(|(day, open, close, high, low, volume)| KlineBar {
            symbol: "sh600519".to_string(),
            period: KlinePeriod::Daily,
            time: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + Duration::days(day),
            open,
            close,
            high,
            low,
            volume,
            amount: volume * close,
            amplitude: None,
            change: None,
            change_percent: None,
            turnover_rate: None,
        })
}

fn arb_period() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), Just(5), Just(6), Just(12), Just(14), Just(26)]
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// RSI stays within [0, 100] wherever it is defined.
    #[test]
    fn prop_rsi_is_bounded(closes in arb_closes(120), period in arb_period()) {
        for value in rsi(&closes, period).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&value), "RSI out of range: {}", value);
        }
    }

    /// RSI is exactly 100 on a strictly rising series.
    #[test]
    fn prop_rsi_of_rising_series_is_100(closes in arb_rising(15)) {
        let series = rsi(&closes, 14);
        prop_assert_eq!(series[14], Some(100.0));
    }

    /// The histogram equals twice the DIF/DEA gap at every defined index.
    #[test]
    fn prop_macd_histogram_identity(closes in arb_closes(150)) {
        let series = macd(&closes, MacdParams::default());
        for i in 0..closes.len() {
            if let (Some(dif), Some(dea), Some(hist)) =
                (series.dif[i], series.dea[i], series.histogram[i])
            {
                prop_assert!((hist - 2.0 * (dif - dea)).abs() <= 1e-9 * (1.0 + hist.abs()));
            }
        }
    }

    /// Every indicator output has the length of its input and is undefined
    /// exactly until its lookback is satisfied.
    #[test]
    fn prop_alignment(closes in arb_closes(80), period in arb_period()) {
        let s = sma(&closes, period);
        let e = ema(&closes, period);
        let r = rsi(&closes, period);
        prop_assert_eq!(s.len(), closes.len());
        prop_assert_eq!(e.len(), closes.len());
        prop_assert_eq!(r.len(), closes.len());

        for i in 0..closes.len() {
            prop_assert_eq!(s[i].is_some(), i + 1 >= period);
            prop_assert_eq!(e[i].is_some(), i + 1 >= period);
            prop_assert_eq!(r[i].is_some(), i >= period);
        }
    }

    /// Recomputing an EMA over the same slice gives identical output.
    #[test]
    fn prop_ema_is_deterministic(closes in arb_closes(100), period in arb_period()) {
        prop_assert_eq!(ema(&closes, period), ema(&closes, period));
    }

    /// SMA of a window lies between the window's min and max.
    #[test]
    fn prop_sma_within_window(closes in arb_closes(60), period in arb_period()) {
        for (i, value) in sma(&closes, period).into_iter().enumerate() {
            if let Some(value) = value {
                let window = &closes[i + 1 - period..=i];
                let min = window.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(value >= min - 1e-9 && value <= max + 1e-9);
            }
        }
    }

    /// Normalized bars respect the OHLC bounds and are strictly ascending.
    #[test]
    fn prop_normalized_bars_are_valid(bars in proptest::collection::vec(arb_bar(), 0..80)) {
        let normalized = normalize_series(bars);
        for bar in &normalized {
            prop_assert!(bar.low <= bar.open && bar.open <= bar.high);
            prop_assert!(bar.low <= bar.close && bar.close <= bar.high);
        }
        for pair in normalized.windows(2) {
            prop_assert!(pair[0].time < pair[1].time);
        }
    }
}
