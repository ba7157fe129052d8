//! Eastmoney push2 provider.
//!
//! Structured JSON endpoints:
//! - `stock/get` for the quote and the five-level book (keyed, pre-scaled fields)
//! - `stock/kline/get` for candles (comma-joined positional records)
//! - `stock/trends2/get` for today's minute ticks

mod fields;
mod models;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::MarketDataError;
use crate::models::{KlineBar, KlinePeriod, OrderBook, Quote, TickPoint};
use crate::provider::http::HttpFetcher;
use crate::provider::{MarketDataProvider, ProviderCapabilities, ProviderSettings, QuoteWithBook};
use crate::resolver::NormalizedSymbol;

pub(crate) const PROVIDER_ID: &str = "EASTMONEY";

const QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const TRENDS_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/trends2/get";

const ALL_PERIODS: &[KlinePeriod] = &[
    KlinePeriod::Min1,
    KlinePeriod::Min5,
    KlinePeriod::Min15,
    KlinePeriod::Min30,
    KlinePeriod::Min60,
    KlinePeriod::Daily,
    KlinePeriod::Weekly,
    KlinePeriod::Monthly,
];

/// `klt` parameter of the kline endpoint.
fn klt(period: KlinePeriod) -> &'static str {
    match period {
        KlinePeriod::Min1 => "1",
        KlinePeriod::Min5 => "5",
        KlinePeriod::Min15 => "15",
        KlinePeriod::Min30 => "30",
        KlinePeriod::Min60 => "60",
        KlinePeriod::Daily => "101",
        KlinePeriod::Weekly => "102",
        KlinePeriod::Monthly => "103",
    }
}

/// Eastmoney market data provider.
pub struct EastmoneyProvider {
    http: HttpFetcher,
    priority: u8,
}

impl EastmoneyProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            http: HttpFetcher::new(PROVIDER_ID, settings.timeout, None),
            priority: 1,
        }
    }

    /// Overrides the registry priority (lower runs first).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    async fn fetch_snapshot(&self, symbol: &NormalizedSymbol) -> Result<String, MarketDataError> {
        let params = [
            ("secid", symbol.eastmoney_secid()),
            ("fields", fields::quote_field_list()),
            ("invt", "2".to_string()),
        ];
        self.http.get_text(QUOTE_URL, &params).await
    }
}

#[async_trait]
impl MarketDataProvider for EastmoneyProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            kline_periods: ALL_PERIODS,
            supports_ticks: true,
            supports_order_book: true,
        }
    }

    async fn fetch_quote(&self, symbol: &NormalizedSymbol) -> Result<Quote, MarketDataError> {
        let body = self.fetch_snapshot(symbol).await?;
        let quote = models::parse_quote(symbol, &body)?;
        debug!("Eastmoney quote for {}: {}", quote.symbol, quote.price);
        Ok(quote)
    }

    async fn fetch_klines(
        &self,
        symbol: &NormalizedSymbol,
        period: KlinePeriod,
        count: usize,
    ) -> Result<Vec<KlineBar>, MarketDataError> {
        let params = [
            ("secid", symbol.eastmoney_secid()),
            ("klt", klt(period).to_string()),
            ("fqt", "1".to_string()),
            ("lmt", count.to_string()),
            ("end", "20500101".to_string()),
            ("fields1", "f1,f2,f3".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61".to_string()),
        ];
        let body = self.http.get_text(KLINE_URL, &params).await?;
        let mut bars = models::parse_klines(symbol, period, &body)?;

        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }
        info!(
            "Eastmoney returned {} {} bars for {}",
            bars.len(),
            period,
            symbol.canonical()
        );
        Ok(bars)
    }

    async fn fetch_ticks(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<Vec<TickPoint>, MarketDataError> {
        let params = [
            ("secid", symbol.eastmoney_secid()),
            ("ndays", "1".to_string()),
            ("iscr", "0".to_string()),
            ("fields1", "f1,f2,f3,f4,f5,f6,f7,f8".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58".to_string()),
        ];
        let body = self.http.get_text(TRENDS_URL, &params).await?;
        models::parse_ticks(symbol, &body)
    }

    async fn fetch_order_book(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<OrderBook, MarketDataError> {
        let body = self.fetch_snapshot(symbol).await?;
        models::parse_order_book(symbol, &body)
    }

    async fn fetch_quote_with_book(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<QuoteWithBook, MarketDataError> {
        let body = self.fetch_snapshot(symbol).await?;
        let quote = models::parse_quote(symbol, &body)?;
        let order_book = models::parse_order_book(symbol, &body);
        debug!("Eastmoney snapshot for {}: {}", quote.symbol, quote.price);
        Ok(QuoteWithBook { quote, order_book })
    }
}
