//! Refresh event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::refresh::{FetchError, PartialDataWarning};

/// Events emitted by the orchestrator as a symbol moves through a refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefreshEvent {
    /// A fetch was admitted for the symbol.
    Started { symbol: String, at: DateTime<Utc> },

    /// A new snapshot replaced the previous one.
    Ready {
        symbol: String,
        at: DateTime<Utc>,
        /// Sections that were missing or incomplete
        warnings: Vec<PartialDataWarning>,
    },

    /// The mandatory quote could not be fetched. The previous snapshot is kept.
    Failed {
        symbol: String,
        at: DateTime<Utc>,
        error: FetchError,
    },
}

impl RefreshEvent {
    pub fn started(symbol: impl Into<String>) -> Self {
        Self::Started {
            symbol: symbol.into(),
            at: Utc::now(),
        }
    }

    pub fn ready(symbol: impl Into<String>, warnings: Vec<PartialDataWarning>) -> Self {
        Self::Ready {
            symbol: symbol.into(),
            at: Utc::now(),
            warnings,
        }
    }

    pub fn failed(symbol: impl Into<String>, error: FetchError) -> Self {
        Self::Failed {
            symbol: symbol.into(),
            at: Utc::now(),
            error,
        }
    }

    /// Symbol the event belongs to.
    pub fn symbol(&self) -> &str {
        match self {
            Self::Started { symbol, .. }
            | Self::Ready { symbol, .. }
            | Self::Failed { symbol, .. } => symbol,
        }
    }
}
