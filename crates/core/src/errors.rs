//! Core error types for the StockPulse orchestrator.
//!
//! Adapter and normalization failures arrive as [`MarketDataError`] and are
//! wrapped here. Everything else is an orchestration concern.

use stockpulse_market_data::{ErrorKind, MarketDataError};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Symbol '{0}' is not tracked")]
    NotTracked(String),

    #[error("A manual refresh is already in progress")]
    RefreshInProgress,

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),
}

impl Error {
    /// Taxonomy bucket for market data errors, `None` for orchestration errors.
    pub fn market_data_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::MarketData(e) => Some(e.kind()),
            _ => None,
        }
    }
}
