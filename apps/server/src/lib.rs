//! StockPulse server: HTTP surface over the fetch orchestrator.

pub mod api;
pub mod config;
pub mod error;
pub mod main_lib;
pub mod scheduler;

pub use main_lib::{build_state, AppState};
