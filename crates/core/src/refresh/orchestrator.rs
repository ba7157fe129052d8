//! Fetch orchestrator.
//!
//! Owns one [`SymbolFetchState`] per tracked symbol in a store keyed by
//! canonical symbol. Refreshes of different symbols run as independent tasks
//! and share nothing but that store; there is no lock spanning symbols.
//!
//! A refresh goes `Idle -> Fetching -> {Ready | Failed}`. The quote is
//! mandatory and arrives with the order book of the same provider snapshot.
//! Klines and ticks are fetched concurrently once the quote is in. A failure
//! in any of these sections only produces a [`PartialDataWarning`]. The snapshot is assembled in full before it
//! replaces the previous one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Serialize;
use stockpulse_market_data::{
    normalize, ErrorKind, KlineBar, MarketDataError, NormalizedSymbol, OrderBook,
    ProviderRegistry, TickPoint,
};
use tokio::task::JoinHandle;

use super::config::OrchestratorConfig;
use super::scheduler::{self, SchedulerHandle};
use super::snapshot::MarketSnapshot;
use super::state::{FetchError, PartialDataWarning, Section, SymbolFetchState, SymbolView};
use crate::errors::{Error, Result};
use crate::events::{RefreshEvent, RefreshEventSink};

// =============================================================================
// Outcomes
// =============================================================================

/// What happened to one refresh request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshOutcome {
    /// A new snapshot was published.
    Ready,
    /// The quote could not be fetched; the previous snapshot was kept.
    Failed,
    /// Another refresh of the same symbol was already in flight.
    Skipped,
    /// The symbol was untracked (or re-tracked) while the fetch ran.
    Dropped,
}

/// Counts of outcomes across one refresh of all tracked symbols.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub ready: usize,
    pub failed: usize,
    pub skipped: usize,
    pub dropped: usize,
}

impl RefreshSummary {
    fn record(&mut self, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Ready => self.ready += 1,
            RefreshOutcome::Failed => self.failed += 1,
            RefreshOutcome::Skipped => self.skipped += 1,
            RefreshOutcome::Dropped => self.dropped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ready + self.failed + self.skipped + self.dropped
    }
}

// =============================================================================
// Per-symbol slots and admission
// =============================================================================

/// Store entry for one tracked symbol.
///
/// Entry identity matters: a slot removed by `untrack` and replaced by a
/// later `track` is a different `Arc`, so results of fetches started against
/// the old slot can be recognized and discarded.
struct SymbolSlot {
    symbol: NormalizedSymbol,
    in_flight: AtomicBool,
    state: RwLock<SymbolFetchState>,
}

impl SymbolSlot {
    fn new(symbol: NormalizedSymbol) -> Self {
        Self {
            symbol,
            in_flight: AtomicBool::new(false),
            state: RwLock::new(SymbolFetchState::default()),
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, SymbolFetchState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut SymbolFetchState)) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state);
    }
}

/// RAII guard that marks a symbol as in flight until dropped.
struct InFlightGuard {
    slot: Arc<SymbolSlot>,
}

impl InFlightGuard {
    /// Returns `None` when a refresh of the symbol is already running.
    fn try_acquire(slot: &Arc<SymbolSlot>) -> Option<Self> {
        slot.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                slot: Arc::clone(slot),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.slot.in_flight.store(false, Ordering::Release);
    }
}

/// RAII guard held for the duration of a manual refresh.
struct ManualRefreshGuard {
    inner: Arc<Inner>,
}

impl ManualRefreshGuard {
    fn try_acquire(inner: &Arc<Inner>) -> Option<Self> {
        inner
            .manual_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner: Arc::clone(inner),
            })
    }
}

impl Drop for ManualRefreshGuard {
    fn drop(&mut self) {
        self.inner.manual_in_progress.store(false, Ordering::Release);
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

struct Inner {
    registry: Arc<ProviderRegistry>,
    config: OrchestratorConfig,
    slots: DashMap<String, Arc<SymbolSlot>>,
    events: Arc<dyn RefreshEventSink>,
    manual_in_progress: AtomicBool,
}

/// Optional sections gathered after the quote.
struct Sections {
    klines: Option<Vec<KlineBar>>,
    ticks: Option<Vec<TickPoint>>,
    order_book: Option<OrderBook>,
    warnings: Vec<PartialDataWarning>,
}

impl Inner {
    /// Whether `slot` is still the live entry for `key`.
    fn is_current(&self, key: &str, slot: &Arc<SymbolSlot>) -> bool {
        self.slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current.value(), slot))
    }

    fn live_slots(&self) -> Vec<(String, Arc<SymbolSlot>)> {
        self.slots
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    async fn refresh_slot(self: Arc<Self>, key: String, slot: Arc<SymbolSlot>) -> RefreshOutcome {
        let Some(_guard) = InFlightGuard::try_acquire(&slot) else {
            debug!("Skipping refresh for {} - already in progress", key);
            return RefreshOutcome::Skipped;
        };
        if !self.is_current(&key, &slot) {
            return RefreshOutcome::Dropped;
        }

        slot.update(|state| state.begin(Utc::now()));
        self.events.emit(RefreshEvent::started(&key));

        let head = if self.config.fetch_order_book {
            self.registry
                .fetch_quote_with_book(&slot.symbol)
                .await
                .map(|fetched| (fetched.quote, Some(fetched.order_book)))
        } else {
            self.registry
                .fetch_quote(&slot.symbol)
                .await
                .map(|quote| (quote, None))
        };
        let (quote, order_book) = match head {
            Ok(head) => head,
            Err(e) => {
                if !self.is_current(&key, &slot) {
                    debug!("Dropping failed refresh of untracked symbol {}", key);
                    return RefreshOutcome::Dropped;
                }
                log_failure(&key, &e);
                let error = FetchError::from(&e);
                slot.update(|state| state.fail(error.clone()));
                self.events.emit(RefreshEvent::failed(&key, error));
                return RefreshOutcome::Failed;
            }
        };

        let sections = self.fetch_sections(&slot.symbol, order_book).await;
        let snapshot = MarketSnapshot::assemble(
            quote,
            sections.klines,
            sections.ticks,
            sections.order_book,
            &self.config.indicators,
        );

        if !self.is_current(&key, &slot) {
            debug!("Dropping refresh result of untracked symbol {}", key);
            return RefreshOutcome::Dropped;
        }

        let warnings = sections.warnings;
        slot.update(|state| state.complete(snapshot, warnings.clone()));
        self.events.emit(RefreshEvent::ready(&key, warnings));
        RefreshOutcome::Ready
    }

    /// `order_book` is the book read alongside the quote, if enabled.
    async fn fetch_sections(
        &self,
        symbol: &NormalizedSymbol,
        order_book: Option<std::result::Result<OrderBook, MarketDataError>>,
    ) -> Sections {
        let config = &self.config;

        let klines = self
            .registry
            .fetch_klines(symbol, config.kline_period, config.kline_count);
        let ticks = async {
            if config.fetch_ticks {
                Some(self.registry.fetch_ticks(symbol).await)
            } else {
                None
            }
        };
        let (klines, ticks) = futures::join!(klines, ticks);

        let mut warnings = Vec::new();

        let klines = match klines {
            Ok(bars) => {
                if bars.len() < config.kline_count {
                    warnings.push(PartialDataWarning::ShortKlines {
                        requested: config.kline_count,
                        received: bars.len(),
                    });
                }
                Some(bars)
            }
            Err(e) => {
                warnings.push(PartialDataWarning::section_failed(Section::Klines, &e));
                None
            }
        };

        let ticks = match ticks {
            Some(Ok(ticks)) => Some(ticks),
            Some(Err(e)) => {
                warnings.push(PartialDataWarning::section_failed(Section::Ticks, &e));
                None
            }
            None => None,
        };

        let order_book = match order_book {
            Some(Ok(book)) => {
                if book.is_empty() {
                    warnings.push(PartialDataWarning::EmptyOrderBook);
                }
                Some(book)
            }
            Some(Err(e)) => {
                warnings.push(PartialDataWarning::section_failed(Section::OrderBook, &e));
                None
            }
            None => None,
        };

        for warning in &warnings {
            debug!("Partial data for {}: {:?}", symbol.canonical(), warning);
        }

        Sections {
            klines,
            ticks,
            order_book,
            warnings,
        }
    }
}

fn log_failure(symbol: &str, err: &MarketDataError) {
    match err.kind() {
        ErrorKind::UpstreamFormat => {
            error!("Unexpected upstream response for {}: {}", symbol, err)
        }
        _ => warn!("Refresh failed for {}: {}", symbol, err),
    }
}

/// Schedules and runs per-symbol refreshes and exposes the latest snapshots.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct FetchOrchestrator {
    inner: Arc<Inner>,
}

impl FetchOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        config: OrchestratorConfig,
        events: Arc<dyn RefreshEventSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                config,
                slots: DashMap::new(),
                events,
                manual_in_progress: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.inner.registry
    }

    /// Starts tracking a symbol and returns its canonical form.
    ///
    /// Tracking an already tracked symbol is a no-op. Malformed symbols are
    /// rejected before anything is stored.
    pub fn track(&self, raw_symbol: &str) -> Result<String> {
        let symbol = normalize(raw_symbol)?;
        let key = symbol.canonical();
        match self.inner.slots.entry(key.clone()) {
            Entry::Occupied(_) => debug!("{} is already tracked", key),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(SymbolSlot::new(symbol)));
                info!("Tracking {}", key);
            }
        }
        Ok(key)
    }

    /// Stops tracking a symbol. A fetch already in flight runs to completion
    /// but its result is discarded.
    pub fn untrack(&self, raw_symbol: &str) -> Result<()> {
        let key = normalize(raw_symbol)?.canonical();
        match self.inner.slots.remove(&key) {
            Some(_) => {
                info!("Stopped tracking {}", key);
                Ok(())
            }
            None => Err(Error::NotTracked(key)),
        }
    }

    /// Canonical symbols currently tracked, sorted.
    pub fn tracked(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        symbols.sort();
        symbols
    }

    pub fn is_tracked(&self, raw_symbol: &str) -> bool {
        normalize(raw_symbol)
            .map(|symbol| self.inner.slots.contains_key(&symbol.canonical()))
            .unwrap_or(false)
    }

    fn lookup(&self, raw_symbol: &str) -> Result<(String, Arc<SymbolSlot>)> {
        let key = normalize(raw_symbol)?.canonical();
        let slot = self
            .inner
            .slots
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotTracked(key.clone()))?;
        Ok((key, slot))
    }

    /// Refreshes one tracked symbol unless a refresh of it is already running.
    pub async fn refresh_symbol(&self, raw_symbol: &str) -> Result<RefreshOutcome> {
        let (key, slot) = self.lookup(raw_symbol)?;
        Ok(Arc::clone(&self.inner).refresh_slot(key, slot).await)
    }

    /// Refreshes every tracked symbol, each in its own task.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let handles: Vec<_> = self
            .inner
            .live_slots()
            .into_iter()
            .map(|(key, slot)| tokio::spawn(Arc::clone(&self.inner).refresh_slot(key, slot)))
            .collect();

        let mut summary = RefreshSummary::default();
        for result in join_all(handles).await {
            match result {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    error!("Refresh task aborted: {}", e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Starts a refresh of every tracked symbol without waiting for any of
    /// them and returns how many were dispatched.
    ///
    /// Each symbol runs in its own detached task. A symbol still in flight
    /// from an earlier dispatch is skipped by admission control, so a slow
    /// symbol never holds back the next cycle of the others.
    pub fn dispatch_all(&self) -> usize {
        let slots = self.inner.live_slots();
        for (key, slot) in &slots {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            let slot = Arc::clone(slot);
            tokio::spawn(async move {
                let outcome = inner.refresh_slot(key.clone(), slot).await;
                debug!("Scheduled refresh of {}: {:?}", key, outcome);
            });
        }
        slots.len()
    }

    /// Refreshes every tracked symbol now.
    ///
    /// Returns [`Error::RefreshInProgress`] while another manual refresh is
    /// running. Scheduled refreshes are not affected by this flag; per-symbol
    /// admission still applies.
    pub async fn manual_refresh(&self) -> Result<RefreshSummary> {
        let _guard =
            ManualRefreshGuard::try_acquire(&self.inner).ok_or(Error::RefreshInProgress)?;
        info!("Manual refresh of {} symbols", self.inner.slots.len());
        Ok(self.refresh_all().await)
    }

    /// Starts a manual refresh in the background.
    ///
    /// The coalescing check happens before this returns, so callers learn
    /// synchronously whether the refresh was accepted.
    pub fn spawn_manual_refresh(&self) -> Result<JoinHandle<RefreshSummary>> {
        let guard =
            ManualRefreshGuard::try_acquire(&self.inner).ok_or(Error::RefreshInProgress)?;
        info!("Manual refresh of {} symbols", self.inner.slots.len());
        let orchestrator = self.clone();
        Ok(tokio::spawn(async move {
            let _guard = guard;
            orchestrator.refresh_all().await
        }))
    }

    pub fn is_manual_refresh_running(&self) -> bool {
        self.inner.manual_in_progress.load(Ordering::Acquire)
    }

    /// Latest view of one tracked symbol.
    pub fn view(&self, raw_symbol: &str) -> Result<SymbolView> {
        let (key, slot) = self.lookup(raw_symbol)?;
        let view = SymbolView::from_state(&key, &slot.state());
        Ok(view)
    }

    /// Latest views of all tracked symbols, sorted by symbol.
    pub fn views(&self) -> Vec<SymbolView> {
        let mut views: Vec<SymbolView> = self
            .inner
            .live_slots()
            .iter()
            .map(|(key, slot)| SymbolView::from_state(key, &slot.state()))
            .collect();
        views.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        views
    }

    /// Starts the periodic refresh loop using the configured period.
    pub fn spawn_scheduler(&self) -> SchedulerHandle {
        scheduler::spawn(self.clone(), self.inner.config.refresh_period)
    }
}
