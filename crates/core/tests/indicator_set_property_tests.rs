//! Property-based tests for indicator sets computed from kline series.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use stockpulse_core::refresh::{IndicatorConfig, IndicatorSet};
use stockpulse_market_data::{KlineBar, KlinePeriod, MacdParams};

// =============================================================================
// Generators
// =============================================================================

fn bars_from_closes(closes: &[f64]) -> Vec<KlineBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| KlineBar {
            symbol: "sh600519".to_string(),
            period: KlinePeriod::Daily,
            time: start + Duration::days(i as i64),
            open: close,
            close,
            high: close,
            low: close,
            volume: 100.0,
            amount: close * 100.0,
            amplitude: None,
            change: None,
            change_percent: None,
            turnover_rate: None,
        })
        .collect()
}

/// Generates a series of positive closing prices.
fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(1.0f64..5000.0, 0..=max_len)
}

/// Generates an indicator configuration with small periods.
fn arb_config() -> impl Strategy<Value = IndicatorConfig> {
    (
        proptest::collection::vec(1usize..30, 0..4),
        proptest::collection::vec(1usize..30, 0..3),
        proptest::collection::vec(1usize..20, 0..2),
        proptest::option::of((1usize..10, 10usize..30, 1usize..10)),
    )
        .prop_map(|(sma, ema, rsi, macd)| IndicatorConfig {
            sma,
            ema,
            rsi,
            macd: macd.map(|(fast, slow, signal)| MacdParams { fast, slow, signal }),
        })
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every computed series is as long as the kline series.
    #[test]
    fn prop_series_align_with_bars(closes in arb_closes(120), config in arb_config()) {
        let bars = bars_from_closes(&closes);
        let set = IndicatorSet::compute(&bars, &config);

        prop_assert_eq!(set.series.len(), config.kinds().len());
        for series in &set.series {
            prop_assert_eq!(series.values.len(), bars.len());
        }
        if let Some(macd) = &set.macd {
            prop_assert_eq!(macd.dif.len(), bars.len());
            prop_assert_eq!(macd.dea.len(), bars.len());
            prop_assert_eq!(macd.histogram.len(), bars.len());
        }
    }

    /// Recomputing from the same bars gives the same result.
    #[test]
    fn prop_compute_is_deterministic(closes in arb_closes(80), config in arb_config()) {
        let bars = bars_from_closes(&closes);
        prop_assert_eq!(
            IndicatorSet::compute(&bars, &config),
            IndicatorSet::compute(&bars, &config)
        );
    }

    /// A series shorter than the lookback has no defined value.
    #[test]
    fn prop_short_history_is_undefined(len in 0usize..5) {
        let closes: Vec<f64> = (0..len).map(|i| 10.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let config = IndicatorConfig {
            sma: vec![5],
            ema: vec![5],
            rsi: vec![5],
            macd: None,
        };
        let set = IndicatorSet::compute(&bars, &config);
        for series in &set.series {
            prop_assert!(series.values.iter().all(Option::is_none));
        }
    }
}
