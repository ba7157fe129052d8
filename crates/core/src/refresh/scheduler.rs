//! Periodic refresh loop.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::orchestrator::FetchOrchestrator;

/// Handle to a running scheduler. Dropping it also stops the loop.
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the loop and waits for it to exit. Refreshes already dispatched
    /// run to completion.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            warn!("Refresh scheduler exited abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Starts refreshing every tracked symbol once per `period`.
///
/// The first cycle runs immediately. Ticks only dispatch per-symbol tasks,
/// so the loop itself never waits on the network; a symbol whose previous
/// refresh is still running is skipped for that tick.
pub(crate) fn spawn(orchestrator: FetchOrchestrator, period: Duration) -> SchedulerHandle {
    let (shutdown, mut shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        info!("Refresh scheduler started ({}s interval)", period.as_secs_f64());

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    let dispatched = orchestrator.dispatch_all();
                    debug!("Scheduled refresh dispatched for {} symbols", dispatched);
                }
            }
        }

        info!("Refresh scheduler stopped");
    });

    SchedulerHandle {
        shutdown: Some(shutdown),
        task,
    }
}
