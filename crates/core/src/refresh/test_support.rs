//! Fixtures shared by the refresh tests.

use chrono::{Duration, NaiveDate, Utc};
use stockpulse_market_data::models::derive_change;
use stockpulse_market_data::{KlineBar, KlinePeriod, Quote};

use super::config::IndicatorConfig;
use super::MarketSnapshot;

pub(crate) fn quote(symbol: &str, price: f64) -> Quote {
    let previous_close = price - 1.0;
    let (change, change_percent) = derive_change(price, previous_close);
    Quote {
        symbol: symbol.to_string(),
        name: format!("{} name", symbol),
        price,
        change,
        change_percent,
        open: previous_close,
        high: price,
        low: previous_close,
        previous_close,
        volume: 1_000.0,
        amount: price * 1_000.0,
        turnover_rate: None,
        pe: None,
        pb: None,
        market_cap: None,
        timestamp: Utc::now(),
        source: "MOCK".to_string(),
    }
}

pub(crate) fn daily_bars(symbol: &str, closes: &[f64]) -> Vec<KlineBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| KlineBar {
            symbol: symbol.to_string(),
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

pub(crate) fn snapshot(symbol: &str, price: f64) -> MarketSnapshot {
    MarketSnapshot::assemble(
        quote(symbol, price),
        None,
        None,
        None,
        &IndicatorConfig::default(),
    )
}
