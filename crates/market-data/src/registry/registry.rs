//! Provider registry.
//!
//! Orders providers by preference and priority, skips providers whose
//! circuit is open or that lack the capability, falls through on recoverable
//! errors and validates quotes before handing them out.

use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info, warn};

use super::{CircuitBreaker, ProviderHealth, QuoteValidator};
use crate::errors::{MarketDataError, RetryClass};
use crate::models::{KlineBar, KlinePeriod, OrderBook, Quote, TickPoint};
use crate::provider::{MarketDataProvider, ProviderCapabilities, QuoteWithBook};
use crate::resolver::NormalizedSymbol;

/// Provider registry for orchestrating market data fetching.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    preferred: Option<&'static str>,
    circuit_breaker: CircuitBreaker,
    validator: QuoteValidator,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self::with_config(providers, CircuitBreaker::new(), QuoteValidator::new())
    }

    pub fn with_config(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        circuit_breaker: CircuitBreaker,
        validator: QuoteValidator,
    ) -> Self {
        Self {
            providers,
            preferred: None,
            circuit_breaker,
            validator,
        }
    }

    /// Tries `provider_id` before every other provider, regardless of priority.
    pub fn with_preferred(mut self, provider_id: &'static str) -> Self {
        self.preferred = Some(provider_id);
        self
    }

    /// Providers able to serve a request, preferred first, then by priority.
    fn ordered_providers(
        &self,
        supports: impl Fn(&ProviderCapabilities) -> bool,
    ) -> Vec<&Arc<dyn MarketDataProvider>> {
        let mut providers: Vec<_> = self
            .providers
            .iter()
            .filter(|p| supports(&p.capabilities()))
            .collect();

        providers.sort_by_key(|p| {
            if Some(p.id()) == self.preferred {
                0u16
            } else {
                p.priority() as u16 + 1
            }
        });
        providers
    }

    /// Runs `call` against each eligible provider until one succeeds.
    ///
    /// `accept` runs on every successful result and may reject it, which
    /// moves on to the next provider.
    async fn with_failover<'a, T>(
        &'a self,
        operation: &str,
        symbol: &NormalizedSymbol,
        supports: impl Fn(&ProviderCapabilities) -> bool,
        call: impl Fn(&'a dyn MarketDataProvider) -> BoxFuture<'a, Result<T, MarketDataError>>,
        accept: impl Fn(&T) -> Result<(), MarketDataError>,
    ) -> Result<T, MarketDataError> {
        let providers = self.ordered_providers(supports);
        if providers.is_empty() {
            debug!("No provider supports {} for {}", operation, symbol.canonical());
            return Err(MarketDataError::not_supported("registry", operation));
        }

        let key = symbol.canonical();
        let mut last_error: Option<MarketDataError> = None;

        for provider in providers {
            let provider_id = provider.id();

            if !self.circuit_breaker.allow(provider_id, &key) {
                debug!(
                    "Circuit open for '{}' on {}, skipping {}",
                    provider_id, key, operation
                );
                last_error = Some(MarketDataError::CircuitOpen {
                    provider: provider_id.to_string(),
                });
                continue;
            }

            match call(provider.as_ref()).await {
                Ok(value) => {
                    self.circuit_breaker.record_success(provider_id, &key);
                    if let Err(e) = accept(&value) {
                        warn!("{} from '{}' rejected: {}", operation, provider_id, e);
                        last_error = Some(e);
                        continue;
                    }
                    return Ok(value);
                }
                Err(e) => match e.retry_class() {
                    RetryClass::Never => {
                        info!("Terminal error from '{}': {}, not retrying", provider_id, e);
                        return Err(e);
                    }
                    RetryClass::FailoverWithPenalty => {
                        self.circuit_breaker.record_failure(provider_id, &key);
                        warn!("{} for {} failed on '{}': {}", operation, key, provider_id, e);
                        last_error = Some(e);
                    }
                    RetryClass::NextProvider | RetryClass::CircuitOpen => {
                        info!(
                            "'{}' cannot serve {} for {}: {}, trying next provider",
                            provider_id, operation, key, e
                        );
                        last_error = Some(e);
                    }
                },
            }
        }

        Err(last_error.unwrap_or(MarketDataError::AllProvidersFailed))
    }

    /// Fetch and validate the latest quote.
    pub async fn fetch_quote<'a>(
        &'a self,
        symbol: &'a NormalizedSymbol,
    ) -> Result<Quote, MarketDataError> {
        self.with_failover(
            "quote",
            symbol,
            |_| true,
            |p| p.fetch_quote(symbol),
            |quote| self.validator.validate(quote),
        )
        .await
    }

    /// Fetch a validated quote and the order book of the same snapshot.
    ///
    /// Failover is decided by the quote alone, so the book always comes from
    /// the provider that supplied the quote.
    pub async fn fetch_quote_with_book<'a>(
        &'a self,
        symbol: &'a NormalizedSymbol,
    ) -> Result<QuoteWithBook, MarketDataError> {
        self.with_failover(
            "quote",
            symbol,
            |_| true,
            |p| p.fetch_quote_with_book(symbol),
            |fetched: &QuoteWithBook| self.validator.validate(&fetched.quote),
        )
        .await
    }

    /// Fetch up to `count` bars of `period`.
    pub async fn fetch_klines<'a>(
        &'a self,
        symbol: &'a NormalizedSymbol,
        period: KlinePeriod,
        count: usize,
    ) -> Result<Vec<KlineBar>, MarketDataError> {
        self.with_failover(
            "klines",
            symbol,
            |caps| caps.supports_period(period),
            |p| p.fetch_klines(symbol, period, count),
            |_| Ok(()),
        )
        .await
    }

    /// Fetch today's ticks.
    pub async fn fetch_ticks<'a>(
        &'a self,
        symbol: &'a NormalizedSymbol,
    ) -> Result<Vec<TickPoint>, MarketDataError> {
        self.with_failover(
            "ticks",
            symbol,
            |caps| caps.supports_ticks,
            |p| p.fetch_ticks(symbol),
            |_| Ok(()),
        )
        .await
    }

    /// Fetch the five-level order book.
    pub async fn fetch_order_book<'a>(
        &'a self,
        symbol: &'a NormalizedSymbol,
    ) -> Result<OrderBook, MarketDataError> {
        self.with_failover(
            "order book",
            symbol,
            |caps| caps.supports_order_book,
            |p| p.fetch_order_book(symbol),
            |_| Ok(()),
        )
        .await
    }

    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    /// Circuit state of every (provider, symbol) pair that has been called.
    pub fn health(&self) -> Vec<ProviderHealth> {
        self.circuit_breaker.health()
    }

    /// Closes every circuit of `provider_id`.
    pub fn reset_circuit(&self, provider_id: &'static str) {
        self.circuit_breaker.reset(provider_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CircuitBreakerConfig, CircuitState};
    use crate::resolver::normalize;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Transport,
        NotFound,
        BadQuote,
        BookTransport,
    }

    struct MockProvider {
        id: &'static str,
        priority: u8,
        behavior: Behavior,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        fn new(id: &'static str, priority: u8, behavior: Behavior) -> Self {
            Self {
                id,
                priority,
                behavior,
                call_count: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn outcome<T>(&self, value: T) -> Result<T, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed | Behavior::BadQuote | Behavior::BookTransport => Ok(value),
                Behavior::Transport => Err(MarketDataError::Timeout {
                    provider: self.id.to_string(),
                }),
                Behavior::NotFound => Err(MarketDataError::SymbolNotFound("sh600519".to_string())),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                kline_periods: &[KlinePeriod::Daily],
                supports_ticks: false,
                supports_order_book: true,
            }
        }

        async fn fetch_quote(&self, symbol: &NormalizedSymbol) -> Result<Quote, MarketDataError> {
            let price = match self.behavior {
                Behavior::BadQuote => -1.0,
                _ => 10.1,
            };
            let (change, change_percent) = crate::models::derive_change(price, 10.0);
            self.outcome(Quote {
                symbol: symbol.canonical(),
                name: "mock".to_string(),
                price,
                change,
                change_percent,
                open: 10.0,
                high: 10.2,
                low: 9.9,
                previous_close: 10.0,
                volume: 100.0,
                amount: 1000.0,
                turnover_rate: None,
                pe: None,
                pb: None,
                market_cap: None,
                timestamp: Utc::now(),
                source: self.id.to_string(),
            })
        }

        async fn fetch_klines(
            &self,
            _symbol: &NormalizedSymbol,
            _period: KlinePeriod,
            _count: usize,
        ) -> Result<Vec<KlineBar>, MarketDataError> {
            self.outcome(Vec::new())
        }

        async fn fetch_ticks(
            &self,
            _symbol: &NormalizedSymbol,
        ) -> Result<Vec<TickPoint>, MarketDataError> {
            unimplemented!("capabilities exclude ticks")
        }

        async fn fetch_order_book(
            &self,
            _symbol: &NormalizedSymbol,
        ) -> Result<OrderBook, MarketDataError> {
            if let Behavior::BookTransport = self.behavior {
                self.call_count.fetch_add(1, Ordering::SeqCst);
                return Err(MarketDataError::Timeout {
                    provider: self.id.to_string(),
                });
            }
            self.outcome(OrderBook::from_ladders(&[(10.0, 100.0)], &[(10.2, 100.0)]))
        }
    }

    fn registry_of(providers: Vec<Arc<MockProvider>>) -> ProviderRegistry {
        ProviderRegistry::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn MarketDataProvider>)
                .collect(),
        )
    }

    #[test]
    fn test_provider_ordering_by_priority() {
        let registry = registry_of(vec![
            Arc::new(MockProvider::new("LOW_PRIORITY", 20, Behavior::Succeed)),
            Arc::new(MockProvider::new("HIGH_PRIORITY", 5, Behavior::Succeed)),
            Arc::new(MockProvider::new("MED_PRIORITY", 10, Behavior::Succeed)),
        ]);

        let ordered = registry.ordered_providers(|_| true);

        assert_eq!(ordered[0].id(), "HIGH_PRIORITY");
        assert_eq!(ordered[1].id(), "MED_PRIORITY");
        assert_eq!(ordered[2].id(), "LOW_PRIORITY");
    }

    #[test]
    fn test_preferred_provider_first() {
        let registry = registry_of(vec![
            Arc::new(MockProvider::new("PROVIDER_A", 5, Behavior::Succeed)),
            Arc::new(MockProvider::new("PROVIDER_B", 10, Behavior::Succeed)),
        ])
        .with_preferred("PROVIDER_B");

        let ordered = registry.ordered_providers(|_| true);
        assert_eq!(ordered[0].id(), "PROVIDER_B");
        assert_eq!(ordered[1].id(), "PROVIDER_A");
    }

    #[tokio::test]
    async fn test_falls_back_on_transport_error() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1, Behavior::Transport));
        let backup = Arc::new(MockProvider::new("BACKUP", 2, Behavior::Succeed));
        let registry = registry_of(vec![primary.clone(), backup.clone()]);
        let symbol = normalize("600519").unwrap();

        let quote = registry.fetch_quote(&symbol).await.unwrap();

        assert_eq!(quote.source, "BACKUP");
        assert_eq!(primary.calls(), 1);
        assert_eq!(backup.calls(), 1);
        assert_eq!(registry.health()[1].failures, 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_not_found_without_penalty() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1, Behavior::NotFound));
        let backup = Arc::new(MockProvider::new("BACKUP", 2, Behavior::Succeed));
        let registry = registry_of(vec![primary, backup]);
        let symbol = normalize("600519").unwrap();

        registry.fetch_order_book(&symbol).await.unwrap();

        let primary_health = registry
            .health()
            .into_iter()
            .find(|h| h.provider == "PRIMARY")
            .unwrap();
        assert_eq!(primary_health.failures, 0);
    }

    #[tokio::test]
    async fn test_invalid_quote_moves_to_next_provider() {
        let bad = Arc::new(MockProvider::new("BAD", 1, Behavior::BadQuote));
        let good = Arc::new(MockProvider::new("GOOD", 2, Behavior::Succeed));
        let registry = registry_of(vec![bad, good]);
        let symbol = normalize("600519").unwrap();

        let quote = registry.fetch_quote(&symbol).await.unwrap();
        assert_eq!(quote.source, "GOOD");
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let registry = registry_of(vec![
            Arc::new(MockProvider::new("A", 1, Behavior::Transport)),
            Arc::new(MockProvider::new("B", 2, Behavior::Transport)),
        ]);
        let symbol = normalize("600519").unwrap();

        let err = registry.fetch_quote(&symbol).await.unwrap_err();
        assert_eq!(
            err,
            MarketDataError::Timeout {
                provider: "B".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_capability_skips_call() {
        let provider = Arc::new(MockProvider::new("A", 1, Behavior::Succeed));
        let registry = registry_of(vec![provider.clone()]);
        let symbol = normalize("600519").unwrap();

        let err = registry.fetch_ticks(&symbol).await.unwrap_err();
        assert!(matches!(err, MarketDataError::NotSupported { .. }));

        let err = registry
            .fetch_klines(&symbol, KlinePeriod::Weekly, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::NotSupported { .. }));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_provider() {
        let flaky = Arc::new(MockProvider::new("FLAKY", 1, Behavior::Transport));
        let backup = Arc::new(MockProvider::new("BACKUP", 2, Behavior::Succeed));
        let registry = ProviderRegistry::with_config(
            vec![
                flaky.clone() as Arc<dyn MarketDataProvider>,
                backup.clone() as Arc<dyn MarketDataProvider>,
            ],
            CircuitBreaker::with_config(CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::from_secs(60),
                half_open_success_threshold: 1,
            }),
            QuoteValidator::new(),
        );
        let symbol = normalize("600519").unwrap();

        registry.fetch_quote(&symbol).await.unwrap();
        registry.fetch_quote(&symbol).await.unwrap();

        assert_eq!(flaky.calls(), 1);
        assert_eq!(backup.calls(), 2);
        assert_eq!(registry.health()[1].state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_open_circuit_is_scoped_to_its_symbol() {
        let flaky = Arc::new(MockProvider::new("FLAKY", 1, Behavior::Transport));
        let registry = ProviderRegistry::with_config(
            vec![flaky.clone() as Arc<dyn MarketDataProvider>],
            CircuitBreaker::with_config(CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::from_secs(60),
                half_open_success_threshold: 1,
            }),
            QuoteValidator::new(),
        );

        for raw in ["000001", "000002", "000004"] {
            let symbol = normalize(raw).unwrap();
            registry.fetch_quote(&symbol).await.unwrap_err();
        }
        assert_eq!(flaky.calls(), 3);

        // A symbol with no failures of its own still reaches the provider
        let fresh = normalize("600519").unwrap();
        let err = registry.fetch_quote(&fresh).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Timeout { .. }));
        assert_eq!(flaky.calls(), 4);
    }

    #[tokio::test]
    async fn test_book_failure_keeps_quote_of_same_provider() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1, Behavior::BookTransport));
        let backup = Arc::new(MockProvider::new("BACKUP", 2, Behavior::Succeed));
        let registry = registry_of(vec![primary.clone(), backup.clone()]);
        let symbol = normalize("600519").unwrap();

        let fetched = registry.fetch_quote_with_book(&symbol).await.unwrap();

        assert_eq!(fetched.quote.source, "PRIMARY");
        assert!(matches!(fetched.order_book, Err(MarketDataError::Timeout { .. })));
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn test_quote_with_book_fails_over_on_quote() {
        let bad = Arc::new(MockProvider::new("BAD", 1, Behavior::BadQuote));
        let good = Arc::new(MockProvider::new("GOOD", 2, Behavior::Succeed));
        let registry = registry_of(vec![bad, good]);
        let symbol = normalize("600519").unwrap();

        let fetched = registry.fetch_quote_with_book(&symbol).await.unwrap();
        assert_eq!(fetched.quote.source, "GOOD");
        assert_eq!(fetched.order_book.unwrap().bids[0].price, 10.0);
    }
}
