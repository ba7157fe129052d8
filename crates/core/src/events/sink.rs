//! Refresh event sink trait and implementations.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::RefreshEvent;

/// Default capacity of the broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Trait for receiving refresh events.
///
/// `emit()` is called from inside per-symbol refresh tasks, so it must be
/// fast and must never block. Delivery is best-effort.
pub trait RefreshEventSink: Send + Sync {
    /// Emit a single refresh event.
    fn emit(&self, event: RefreshEvent);
}

/// Fans events out to any number of subscribers over a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events; emitting never waits.
#[derive(Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<RefreshEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl RefreshEventSink for BroadcastEventSink {
    fn emit(&self, event: RefreshEvent) {
        // Err only means nobody is listening right now.
        let _ = self.sender.send(event);
    }
}

/// No-op implementation for tests or contexts that don't need events.
#[derive(Clone, Default)]
pub struct NoOpRefreshEventSink;

impl RefreshEventSink for NoOpRefreshEventSink {
    fn emit(&self, _event: RefreshEvent) {}
}

/// Mock sink for testing - collects emitted events.
#[derive(Clone, Default)]
pub struct MockRefreshEventSink {
    events: Arc<Mutex<Vec<RefreshEvent>>>,
}

impl MockRefreshEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<RefreshEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns collected events for one symbol.
    pub fn events_for(&self, symbol: &str) -> Vec<RefreshEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.symbol() == symbol)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RefreshEventSink for MockRefreshEventSink {
    fn emit(&self, event: RefreshEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
