//! Market data provider trait definitions.
//!
//! This module defines the `MarketDataProvider` trait that every upstream
//! adapter implements.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{KlineBar, KlinePeriod, OrderBook, Quote, TickPoint};
use crate::resolver::NormalizedSymbol;

use super::capabilities::ProviderCapabilities;

/// A quote and the order book read from the same provider snapshot.
#[derive(Debug)]
pub struct QuoteWithBook {
    pub quote: Quote,
    pub order_book: Result<OrderBook, MarketDataError>,
}

/// Trait for market data providers.
///
/// Implement this trait to add support for a new upstream source. The
/// registry uses the provider's capabilities and priority to decide when and
/// how to call it.
///
/// Adapters return canonical records or a typed error. An empty but
/// successful upstream response is returned as an empty collection, never as
/// an error, and an upstream business failure is never returned as success.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use stockpulse_market_data::provider::{MarketDataProvider, ProviderCapabilities};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             kline_periods: &[KlinePeriod::Daily],
///             supports_ticks: false,
///             supports_order_book: false,
///         }
///     }
///
///     // ... implement the fetch methods
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider, e.g. "SINA".
    ///
    /// Used for logging, circuit breaker tracking and the `source` field of
    /// quotes.
    fn id(&self) -> &'static str;

    /// Provider priority for ordering.
    ///
    /// Lower values = higher priority. Default is 10.
    fn priority(&self) -> u8 {
        10
    }

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Fetch the latest quote.
    async fn fetch_quote(&self, symbol: &NormalizedSymbol) -> Result<Quote, MarketDataError>;

    /// Fetch up to `count` most recent bars, ordered by time ascending.
    async fn fetch_klines(
        &self,
        symbol: &NormalizedSymbol,
        period: KlinePeriod,
        count: usize,
    ) -> Result<Vec<KlineBar>, MarketDataError>;

    /// Fetch today's intraday ticks, ordered by time ascending.
    async fn fetch_ticks(&self, symbol: &NormalizedSymbol)
        -> Result<Vec<TickPoint>, MarketDataError>;

    /// Fetch the five-level order book.
    async fn fetch_order_book(&self, symbol: &NormalizedSymbol)
        -> Result<OrderBook, MarketDataError>;

    /// Fetch the quote together with the order book of the same snapshot.
    ///
    /// Only the quote decides success; a book that cannot be read is carried
    /// as an error next to it. Providers whose quote endpoint also holds the
    /// book override this to read both from one response. The default makes
    /// two calls.
    async fn fetch_quote_with_book(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<QuoteWithBook, MarketDataError> {
        let quote = self.fetch_quote(symbol).await?;
        let order_book = if self.capabilities().supports_order_book {
            self.fetch_order_book(symbol).await
        } else {
            Err(MarketDataError::not_supported(self.id(), "order book"))
        };
        Ok(QuoteWithBook { quote, order_book })
    }
}
