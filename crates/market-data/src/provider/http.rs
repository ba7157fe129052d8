//! Shared HTTP plumbing for the concrete providers.

use std::time::Duration;

use encoding_rs::GBK;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::errors::MarketDataError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Thin wrapper over a `reqwest::Client` that maps transport failures onto
/// [`MarketDataError`] for one provider.
#[derive(Clone)]
pub(crate) struct HttpFetcher {
    client: Client,
    provider: &'static str,
    referer: Option<&'static str>,
}

impl HttpFetcher {
    pub fn new(provider: &'static str, timeout: Duration, referer: Option<&'static str>) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client for {}: {}, using defaults", provider, e);
                Client::new()
            });

        Self {
            client,
            provider,
            referer,
        }
    }

    /// GET `url` and return the raw body.
    pub async fn get_bytes(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<u8>, MarketDataError> {
        let mut request = self.client.get(url).query(params);
        if let Some(referer) = self.referer {
            request = request.header(reqwest::header::REFERER, referer);
        }

        debug!("{} request: {} with {} params", self.provider, url, params.len());

        let response = request
            .send()
            .await
            .map_err(|e| MarketDataError::from_reqwest(self.provider, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MarketDataError::from_reqwest(self.provider, e))?;
        Ok(body.to_vec())
    }

    /// GET `url` and decode the body as UTF-8.
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, MarketDataError> {
        let bytes = self.get_bytes(url, params).await?;
        String::from_utf8(bytes)
            .map_err(|e| MarketDataError::format(self.provider, format!("invalid UTF-8: {}", e)))
    }

    /// GET `url` and decode the body from GBK.
    pub async fn get_gbk(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, MarketDataError> {
        let bytes = self.get_bytes(url, params).await?;
        Ok(decode_gbk(&bytes))
    }

    fn status_error(&self, status: StatusCode) -> MarketDataError {
        warn!("{} answered HTTP {}", self.provider, status);
        MarketDataError::HttpStatus {
            provider: self.provider.to_string(),
            status: status.as_u16(),
        }
    }
}

/// Decodes GBK text, replacing malformed sequences.
pub(crate) fn decode_gbk(bytes: &[u8]) -> String {
    let (text, _, had_errors) = GBK.decode(bytes);
    if had_errors {
        debug!("GBK payload contained malformed sequences");
    }
    text.into_owned()
}

/// Parses a numeric cell, tolerating surrounding whitespace and thousands
/// separators. Returns `None` for placeholders such as `-` or `--`.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '-') {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
