use std::{net::SocketAddr, time::Duration};

use anyhow::{bail, Context};
use stockpulse_market_data::KlinePeriod;

/// Provider tried first for every request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrimaryProvider {
    Eastmoney,
    Sina,
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub refresh_period: Duration,
    pub http_timeout: Duration,
    pub request_timeout: Duration,
    pub symbols: Vec<String>,
    pub kline_count: usize,
    pub kline_period: KlinePeriod,
    pub primary_provider: PrimaryProvider,
    pub cors_allow: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            refresh_period: Duration::from_secs(60),
            http_timeout: Duration::from_millis(10_000),
            request_timeout: Duration::from_millis(30_000),
            symbols: Vec::new(),
            kline_count: 120,
            kline_period: KlinePeriod::Daily,
            primary_provider: PrimaryProvider::Eastmoney,
            cors_allow: vec!["*".to_string()],
        }
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Reads `SP_*` variables, loading a `.env` file first if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Some(addr) = var("SP_LISTEN_ADDR") {
            config.listen_addr = addr
                .parse()
                .with_context(|| format!("Invalid SP_LISTEN_ADDR '{}'", addr))?;
        }
        if let Some(secs) = var("SP_REFRESH_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid SP_REFRESH_SECS '{}'", secs))?;
            if secs == 0 {
                bail!("SP_REFRESH_SECS must be greater than zero");
            }
            config.refresh_period = Duration::from_secs(secs);
        }
        if let Some(ms) = var("SP_HTTP_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("Invalid SP_HTTP_TIMEOUT_MS '{}'", ms))?;
            config.http_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = var("SP_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms.parse().unwrap_or(30_000));
        }
        if let Some(symbols) = var("SP_SYMBOLS") {
            config.symbols = parse_list(&symbols);
        }
        if let Some(count) = var("SP_KLINE_COUNT") {
            config.kline_count = count
                .parse()
                .with_context(|| format!("Invalid SP_KLINE_COUNT '{}'", count))?;
        }
        if let Some(period) = var("SP_KLINE_PERIOD") {
            config.kline_period = period
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid SP_KLINE_PERIOD: {}", e))?;
        }
        if let Some(provider) = var("SP_PRIMARY_PROVIDER") {
            config.primary_provider = match provider.to_ascii_lowercase().as_str() {
                "eastmoney" => PrimaryProvider::Eastmoney,
                "sina" => PrimaryProvider::Sina,
                other => bail!("Unknown SP_PRIMARY_PROVIDER '{}'", other),
            };
        }
        if let Some(origins) = var("SP_CORS_ALLOW_ORIGINS") {
            config.cors_allow = parse_list(&origins);
        }

        Ok(config)
    }
}
