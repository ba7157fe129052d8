use std::sync::Arc;

use crate::config::{Config, PrimaryProvider};
use stockpulse_core::events::{BroadcastEventSink, RefreshEventSink};
use stockpulse_core::refresh::{FetchOrchestrator, OrchestratorConfig};
use stockpulse_market_data::{
    EastmoneyProvider, MarketDataProvider, ProviderRegistry, ProviderSettings, SinaProvider,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub orchestrator: FetchOrchestrator,
    pub events: BroadcastEventSink,
}

impl AppState {
    /// Wires an orchestrator around `registry`, publishing events on a
    /// broadcast channel the SSE endpoint subscribes to.
    pub fn new(
        registry: ProviderRegistry,
        orchestrator_config: OrchestratorConfig,
    ) -> anyhow::Result<Arc<Self>> {
        let events = BroadcastEventSink::default();
        let sink: Arc<dyn RefreshEventSink> = Arc::new(events.clone());
        let orchestrator =
            FetchOrchestrator::new(Arc::new(registry), orchestrator_config, sink)?;
        Ok(Arc::new(Self {
            orchestrator,
            events,
        }))
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("SP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_registry(config: &Config) -> ProviderRegistry {
    let settings = ProviderSettings {
        timeout: config.http_timeout,
    };
    let eastmoney = Arc::new(EastmoneyProvider::new(&settings));
    let sina = Arc::new(SinaProvider::new(&settings));

    let preferred = match config.primary_provider {
        PrimaryProvider::Eastmoney => eastmoney.id(),
        PrimaryProvider::Sina => sina.id(),
    };
    tracing::info!("Primary market data provider: {}", preferred);

    let providers: Vec<Arc<dyn MarketDataProvider>> = vec![eastmoney, sina];
    ProviderRegistry::new(providers).with_preferred(preferred)
}

pub fn orchestrator_config(config: &Config) -> OrchestratorConfig {
    OrchestratorConfig {
        refresh_period: config.refresh_period,
        kline_period: config.kline_period,
        kline_count: config.kline_count,
        ..Default::default()
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let state = AppState::new(build_registry(config), orchestrator_config(config))?;

    for symbol in &config.symbols {
        match state.orchestrator.track(symbol) {
            Ok(canonical) => tracing::info!("Watching {}", canonical),
            Err(e) => tracing::warn!("Ignoring watchlist entry '{}': {}", symbol, e),
        }
    }

    Ok(state)
}
