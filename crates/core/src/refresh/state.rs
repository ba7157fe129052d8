//! Per-symbol fetch state and the read-only view handed to consumers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockpulse_market_data::{ErrorKind, MarketDataError};

use super::MarketSnapshot;

/// Where a symbol is in its refresh cycle.
///
/// `Ready` and `Failed` go back to `Fetching` on the next trigger.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchPhase {
    #[default]
    Idle,
    Fetching,
    Ready,
    Failed,
}

/// A recorded failure, flattened to what consumers need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&MarketDataError> for FetchError {
    fn from(err: &MarketDataError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Optional section of a snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Klines,
    Ticks,
    OrderBook,
}

/// Something was missing from an otherwise successful refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PartialDataWarning {
    /// The order book came back with no valid level on either side.
    EmptyOrderBook,
    /// Fewer bars than requested.
    #[serde(rename_all = "camelCase")]
    ShortKlines { requested: usize, received: usize },
    /// An optional section could not be fetched and is absent.
    #[serde(rename_all = "camelCase")]
    SectionFailed {
        section: Section,
        kind: ErrorKind,
        message: String,
    },
}

impl PartialDataWarning {
    pub(crate) fn section_failed(section: Section, err: &MarketDataError) -> Self {
        Self::SectionFailed {
            section,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Orchestrator-owned state for one tracked symbol.
#[derive(Clone, Debug, Default)]
pub struct SymbolFetchState {
    pub phase: FetchPhase,
    pub last_error: Option<FetchError>,
    pub snapshot: Option<Arc<MarketSnapshot>>,
    pub warnings: Vec<PartialDataWarning>,
    /// Completion time of the last successful refresh.
    pub last_updated: Option<DateTime<Utc>>,
    /// Start time of the last admitted refresh.
    pub last_attempt: Option<DateTime<Utc>>,
}

impl SymbolFetchState {
    pub fn in_flight(&self) -> bool {
        self.phase == FetchPhase::Fetching
    }

    pub(crate) fn begin(&mut self, at: DateTime<Utc>) {
        self.phase = FetchPhase::Fetching;
        self.last_attempt = Some(at);
    }

    /// Replaces the snapshot in one step and clears the last error.
    pub(crate) fn complete(
        &mut self,
        snapshot: MarketSnapshot,
        warnings: Vec<PartialDataWarning>,
    ) {
        self.last_updated = Some(snapshot.fetched_at);
        self.snapshot = Some(Arc::new(snapshot));
        self.warnings = warnings;
        self.last_error = None;
        self.phase = FetchPhase::Ready;
    }

    /// Records the error and keeps the previous snapshot.
    pub(crate) fn fail(&mut self, error: FetchError) {
        self.last_error = Some(error);
        self.phase = FetchPhase::Failed;
    }
}

/// Read-only view of one symbol.
///
/// The snapshot fields are flattened, so the JSON shape is
/// `{symbol, quote, klines, ticks, orderBook, indicators, fetchedAt, state,
/// lastError, warnings, lastUpdated}`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolView {
    pub symbol: String,
    #[serde(flatten)]
    pub snapshot: Option<Arc<MarketSnapshot>>,
    pub state: FetchPhase,
    pub last_error: Option<FetchError>,
    pub warnings: Vec<PartialDataWarning>,
    pub last_updated: Option<DateTime<Utc>>,
    /// True when the snapshot is older than the last failed attempt.
    pub stale: bool,
}

impl SymbolView {
    pub(crate) fn from_state(symbol: &str, state: &SymbolFetchState) -> Self {
        Self {
            symbol: symbol.to_string(),
            snapshot: state.snapshot.clone(),
            state: state.phase,
            last_error: state.last_error.clone(),
            warnings: state.warnings.clone(),
            last_updated: state.last_updated,
            stale: state.snapshot.is_some() && state.last_error.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::test_support;

    #[test]
    fn test_fail_keeps_previous_snapshot() {
        let mut state = SymbolFetchState::default();
        state.begin(Utc::now());
        assert!(state.in_flight());

        state.complete(test_support::snapshot("sh600519", 1705.5), vec![]);
        assert_eq!(state.phase, FetchPhase::Ready);
        let updated = state.last_updated;

        state.begin(Utc::now());
        state.fail(FetchError {
            kind: ErrorKind::Transport,
            message: "timeout".to_string(),
        });

        assert_eq!(state.phase, FetchPhase::Failed);
        assert!(state.snapshot.is_some());
        assert_eq!(state.last_updated, updated);

        let view = SymbolView::from_state("sh600519", &state);
        assert!(view.stale);
    }

    #[test]
    fn test_warning_serialization() {
        let warning = PartialDataWarning::ShortKlines {
            requested: 120,
            received: 30,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["type"], "shortKlines");
        assert_eq!(json["requested"], 120);

        let err = MarketDataError::Timeout {
            provider: "SINA".to_string(),
        };
        let json = serde_json::to_value(PartialDataWarning::section_failed(Section::Ticks, &err))
            .unwrap();
        assert_eq!(json["section"], "ticks");
        assert_eq!(json["kind"], "transport");
    }

    #[test]
    fn test_view_without_snapshot() {
        let view = SymbolView::from_state("sz000001", &SymbolFetchState::default());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["symbol"], "sz000001");
        assert_eq!(json["state"], "idle");
        assert!(json.get("quote").is_none());
        assert!(!view.stale);
    }
}
