use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time price and volume summary for one security.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Canonical symbol, e.g. `sh600519`.
    pub symbol: String,

    /// Display name as published by the exchange.
    pub name: String,

    /// Last traded price.
    pub price: f64,

    /// `price - previous_close`
    pub change: f64,

    /// `change / previous_close * 100`, zero when there is no previous close.
    pub change_percent: f64,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,

    /// Traded volume in shares.
    pub volume: f64,

    /// Turnover amount in CNY.
    pub amount: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnover_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    /// Observation time reported by the upstream.
    pub timestamp: DateTime<Utc>,

    /// Provider that produced the quote (SINA, EASTMONEY).
    pub source: String,
}

/// Derives `(change, change_percent)` from a price and the previous close.
///
/// A non-positive previous close yields a zero percent change instead of an
/// infinite one.
pub fn derive_change(price: f64, previous_close: f64) -> (f64, f64) {
    let change = price - previous_close;
    let percent = if previous_close > 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    };
    (change, percent)
}

impl Quote {
    /// Returns true when `change` and `change_percent` agree with the price
    /// and previous close within `tolerance`.
    pub fn change_is_consistent(&self, tolerance: f64) -> bool {
        let (change, percent) = derive_change(self.price, self.previous_close);
        (self.change - change).abs() <= tolerance
            && (self.change_percent - percent).abs() <= tolerance
    }
}
