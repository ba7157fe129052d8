//! Background refresh scheduler for the server.

use std::sync::Arc;

use chrono::Utc;
use stockpulse_core::SchedulerHandle;
use stockpulse_market_data::models::session::is_trading_time;
use tracing::info;

use crate::main_lib::AppState;

/// Starts the periodic refresh of every tracked symbol.
///
/// The first cycle runs immediately. Keep the returned handle alive for as
/// long as the scheduler should run.
pub fn start_refresh_scheduler(state: Arc<AppState>) -> SchedulerHandle {
    let orchestrator = &state.orchestrator;
    info!(
        "Refresh scheduler: {} symbols every {}s (market {})",
        orchestrator.tracked().len(),
        orchestrator.config().refresh_period.as_secs(),
        if is_trading_time(Utc::now()) {
            "open"
        } else {
            "closed"
        }
    );
    orchestrator.spawn_scheduler()
}
