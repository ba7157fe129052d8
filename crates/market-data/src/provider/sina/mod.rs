//! Sina Finance provider.
//!
//! Snapshot and HTML style endpoints:
//! - `hq.sinajs.cn` GBK text lines for the quote and the five-level book
//! - `vMS_MarketHistory` GBK HTML pages for daily bars
//! - `getKLineData` JSON for intraday bars
//! - `getMinlineData` JSON for today's minute ticks
//!
//! Requests must carry a Sina referer or the snapshot service answers 403.

mod history;
mod hq_parser;
mod models;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::errors::MarketDataError;
use crate::models::{
    fill_derived_fields, normalize_series, session, KlineBar, KlinePeriod, OrderBook, Quote,
    TickPoint,
};
use crate::provider::http::HttpFetcher;
use crate::provider::{MarketDataProvider, ProviderCapabilities, ProviderSettings, QuoteWithBook};
use crate::resolver::NormalizedSymbol;

pub(crate) const PROVIDER_ID: &str = "SINA";

const REFERER: &str = "https://finance.sina.com.cn";
const HQ_URL: &str = "https://hq.sinajs.cn/list=";
const HISTORY_URL: &str = "https://money.finance.sina.com.cn/corp/go.php/";
const KLINE_URL: &str =
    "https://quotes.sina.cn/cn/api/json_v2.php/CN_MarketDataService.getKLineData";
const MINLINE_URL: &str =
    "https://quotes.sina.cn/cn/api/openapi.php/CN_MinlineService.getMinlineData";

const PERIODS: &[KlinePeriod] = &[
    KlinePeriod::Min5,
    KlinePeriod::Min15,
    KlinePeriod::Min30,
    KlinePeriod::Min60,
    KlinePeriod::Daily,
];

/// Sina Finance market data provider.
pub struct SinaProvider {
    http: HttpFetcher,
    priority: u8,
}

impl SinaProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            http: HttpFetcher::new(PROVIDER_ID, settings.timeout, Some(REFERER)),
            priority: 2,
        }
    }

    /// Overrides the registry priority (lower runs first).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    async fn fetch_snapshot(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<hq_parser::Snapshot, MarketDataError> {
        let url = format!("{}{}", HQ_URL, symbol.sina_code());
        let text = self.http.get_gbk(&url, &[]).await?;
        hq_parser::parse_snapshot(symbol, &text)
    }

    /// Walks quarter pages backwards until `count` daily bars are collected.
    async fn fetch_daily_history(
        &self,
        symbol: &NormalizedSymbol,
        count: usize,
    ) -> Result<Vec<KlineBar>, MarketDataError> {
        let page_url = format!("{}{}", HISTORY_URL, history::history_path(symbol));
        let today = session::exchange_today(Utc::now());

        let url = page_url.as_str();
        let http = &self.http;
        history::collect_quarters(symbol, today, count, move |year, quarter| {
            let params = [("year", year.to_string()), ("jidu", quarter.to_string())];
            async move { http.get_gbk(url, &params).await }
        })
        .await
    }

    async fn fetch_intraday_klines(
        &self,
        symbol: &NormalizedSymbol,
        period: KlinePeriod,
        scale: u32,
        count: usize,
    ) -> Result<Vec<KlineBar>, MarketDataError> {
        let params = [
            ("symbol", symbol.sina_code()),
            ("scale", scale.to_string()),
            ("ma", "no".to_string()),
            ("datalen", count.to_string()),
        ];
        let body = self.http.get_text(KLINE_URL, &params).await?;
        models::parse_kline_json(symbol, period, &body)
    }
}

#[async_trait]
impl MarketDataProvider for SinaProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            kline_periods: PERIODS,
            supports_ticks: true,
            supports_order_book: true,
        }
    }

    async fn fetch_quote(&self, symbol: &NormalizedSymbol) -> Result<Quote, MarketDataError> {
        let snapshot = self.fetch_snapshot(symbol).await?;
        debug!("Sina quote for {}: {}", snapshot.quote.symbol, snapshot.quote.price);
        Ok(snapshot.quote)
    }

    async fn fetch_klines(
        &self,
        symbol: &NormalizedSymbol,
        period: KlinePeriod,
        count: usize,
    ) -> Result<Vec<KlineBar>, MarketDataError> {
        let raw = match (period, models::kline_scale(period)) {
            (KlinePeriod::Daily, _) => self.fetch_daily_history(symbol, count).await?,
            (_, Some(scale)) => {
                self.fetch_intraday_klines(symbol, period, scale, count)
                    .await?
            }
            _ => {
                return Err(MarketDataError::not_supported(
                    PROVIDER_ID,
                    &format!("{} klines", period),
                ))
            }
        };

        let mut bars = normalize_series(raw);
        fill_derived_fields(&mut bars);
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }
        info!("Sina returned {} {} bars for {}", bars.len(), period, symbol.canonical());
        Ok(bars)
    }

    async fn fetch_ticks(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<Vec<TickPoint>, MarketDataError> {
        // The minute line has no reference close, take it from the snapshot.
        let snapshot = self.fetch_snapshot(symbol).await?;
        let params = [("symbol", symbol.sina_code())];
        let body = self.http.get_text(MINLINE_URL, &params).await?;
        let date = snapshot
            .quote
            .timestamp
            .with_timezone(&chrono_tz::Asia::Shanghai)
            .date_naive();
        models::parse_minline(symbol, date, snapshot.quote.previous_close, &body)
    }

    async fn fetch_order_book(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<OrderBook, MarketDataError> {
        Ok(self.fetch_snapshot(symbol).await?.order_book)
    }

    async fn fetch_quote_with_book(
        &self,
        symbol: &NormalizedSymbol,
    ) -> Result<QuoteWithBook, MarketDataError> {
        let snapshot = self.fetch_snapshot(symbol).await?;
        Ok(QuoteWithBook {
            quote: snapshot.quote,
            order_book: Ok(snapshot.order_book),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_identity() {
        let provider = SinaProvider::new(&ProviderSettings::default());
        assert_eq!(provider.id(), "SINA");
        assert_eq!(provider.priority(), 2);
    }

    #[test]
    fn test_capabilities() {
        let caps = SinaProvider::new(&ProviderSettings::default()).capabilities();
        assert!(caps.supports_period(KlinePeriod::Daily));
        assert!(caps.supports_period(KlinePeriod::Min30));
        assert!(!caps.supports_period(KlinePeriod::Weekly));
        assert!(!caps.supports_period(KlinePeriod::Min1));
    }

    #[tokio::test]
    async fn test_unsupported_period_is_rejected_without_network() {
        let provider = SinaProvider::new(&ProviderSettings::default());
        let symbol = crate::resolver::normalize("600519").unwrap();
        let err = provider
            .fetch_klines(&symbol, KlinePeriod::Monthly, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::NotSupported { .. }));
    }
}
