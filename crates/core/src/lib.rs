//! StockPulse Core - per-symbol fetch orchestration.
//!
//! Keeps a keyed store of tracked symbols, refreshes them on a schedule or on
//! demand through the market-data [`ProviderRegistry`], computes indicators
//! over the fetched klines and publishes one immutable snapshot per symbol.
//!
//! [`ProviderRegistry`]: stockpulse_market_data::ProviderRegistry

pub mod errors;
pub mod events;
pub mod refresh;

pub use refresh::{
    FetchOrchestrator, FetchPhase, MarketSnapshot, OrchestratorConfig, RefreshOutcome,
    RefreshSummary, SchedulerHandle, SymbolView,
};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
