//! StockPulse Market Data Crate
//!
//! Fetches A-share market data from upstream providers, normalizes it into
//! one canonical model and computes technical indicators over it.
//!
//! # Architecture
//!
//! ```text
//! raw ticker ("600519", "sz000001")
//!        |
//!        v
//! +------------------+
//! |    Resolver      |  normalize() -> NormalizedSymbol
//! +------------------+
//!        |
//!        v
//! +------------------+     +------------------+
//! | ProviderRegistry | --> |    Providers     |  (Eastmoney, Sina)
//! +------------------+     +------------------+
//!        |                   circuit breaker, failover, validation
//!        v
//! +------------------+
//! | Canonical models |  Quote, KlineBar, TickPoint, OrderBook
//! +------------------+
//!        |
//!        v
//! +------------------+
//! |   Indicators     |  SMA, EMA, MACD, RSI
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`NormalizedSymbol`] - Exchange-qualified security code
//! - [`Quote`], [`KlineBar`], [`TickPoint`], [`OrderBook`] - Canonical records
//! - [`IndicatorSeries`], [`MacdSeries`] - Indicator output aligned with its input
//! - [`ProviderRegistry`] - Failover across providers
//! - [`MarketDataError`] - Error type with its [`ErrorKind`] and [`RetryClass`]

pub mod errors;
pub mod indicators;
pub mod models;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use errors::{ErrorKind, MarketDataError, RetryClass};

pub use models::{
    KlineBar, KlinePeriod, OrderBook, OrderBookLevel, ProviderId, Quote, Side, TickPoint,
};

pub use resolver::{normalize, Market, NormalizedSymbol};

pub use indicators::{IndicatorKind, IndicatorSeries, MacdParams, MacdSeries};

pub use provider::eastmoney::EastmoneyProvider;
pub use provider::sina::SinaProvider;
pub use provider::{MarketDataProvider, ProviderCapabilities, ProviderSettings, QuoteWithBook};

pub use registry::{
    CircuitBreaker, CircuitState, ProviderHealth, ProviderRegistry, QuoteValidator,
};
