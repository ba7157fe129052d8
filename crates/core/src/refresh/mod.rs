//! Per-symbol refresh orchestration.

mod config;
mod orchestrator;
mod scheduler;
mod snapshot;
mod state;

#[cfg(test)]
pub(crate) mod test_support;


pub use config::{
    IndicatorConfig, OrchestratorConfig, DEFAULT_KLINE_COUNT, DEFAULT_REFRESH_PERIOD,
    MAX_KLINE_COUNT,
};
pub use orchestrator::{FetchOrchestrator, RefreshOutcome, RefreshSummary};
pub use scheduler::SchedulerHandle;
pub use snapshot::{IndicatorSet, MarketSnapshot};
pub use state::{
    FetchError, FetchPhase, PartialDataWarning, Section, SymbolFetchState, SymbolView,
};
