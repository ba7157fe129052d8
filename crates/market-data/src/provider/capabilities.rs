//! Provider capability description.

use std::time::Duration;

use crate::models::KlinePeriod;

/// Describes what a market data provider can serve.
///
/// The registry skips providers that cannot serve a request instead of
/// calling them and waiting for a `NotSupported` error.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Kline periods the provider can return.
    pub kline_periods: &'static [KlinePeriod],

    /// Whether intraday ticks are available.
    pub supports_ticks: bool,

    /// Whether the five-level order book is available.
    pub supports_order_book: bool,
}

impl ProviderCapabilities {
    pub fn supports_period(&self, period: KlinePeriod) -> bool {
        self.kline_periods.contains(&period)
    }
}

/// HTTP settings shared by the concrete providers.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    /// Per-request deadline. An expired deadline surfaces as a timeout error.
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}
