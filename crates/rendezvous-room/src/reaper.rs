//! Periodic eviction of abandoned rooms.
//!
//! Hosts that vanish without closing their room would otherwise leave it
//! in the registry forever. The reaper sweeps on a fixed period and
//! drops rooms that have been idle longer than the timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::RoomRegistry;

/// Spawns and owns the sweep task.
pub struct Reaper;

impl Reaper {
    /// Starts sweeping `registry` every `interval`, evicting rooms idle
    /// for longer than `timeout`.
    ///
    /// The first sweep happens one `interval` after spawning. Must be
    /// called from within a Tokio runtime.
    pub fn spawn(
        registry: Arc<RoomRegistry>,
        interval: Duration,
        timeout: Duration,
    ) -> ReaperHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(registry, interval, timeout, shutdown_rx));
        tracing::info!(
            interval_secs = interval.as_secs(),
            timeout_secs = timeout.as_secs(),
            "reaper started"
        );
        ReaperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running reaper.
///
/// Dropping the handle also stops the task (the shutdown channel
/// closes), but without waiting for it.
pub struct ReaperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the reaper and waits for the task to exit. A sweep already
    /// in progress runs to completion first.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "reaper task ended abnormally");
        }
    }

    /// Returns `true` if the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    registry: Arc<RoomRegistry>,
    period: Duration,
    timeout: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // Fires on an explicit shutdown and when the handle is dropped.
            _ = &mut shutdown => break,
            _ = ticker.tick() => sweep(&registry, timeout).await,
        }
    }

    tracing::info!("reaper stopped");
}

/// Runs one sweep on the blocking pool.
///
/// The registry writes its snapshot synchronously, so the sweep stays
/// off the async workers. A panicking sweep surfaces as a `JoinError`
/// and is logged; the next tick still happens.
async fn sweep(registry: &Arc<RoomRegistry>, timeout: Duration) {
    let registry = Arc::clone(registry);
    let result = tokio::task::spawn_blocking(move || {
        let now = registry.clock().now();
        registry.reap_expired(now, timeout)
    })
    .await;

    match result {
        Ok(0) => tracing::trace!("reaper sweep found nothing to remove"),
        Ok(removed) => {
            tracing::info!(removed, "reaper removed inactive rooms");
        }
        Err(e) => tracing::error!(error = %e, "reaper sweep failed"),
    }
}
