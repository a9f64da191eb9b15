//! Expiration Sweeper
//!
//! Background loop that closes polls whose end time has passed, through the
//! same close path as `!endpoll`. Wakes every `interval` or on shutdown.

use super::engine::PollEngine;
use crate::gateway::{self, DynGateway, Gateway};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default time between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Longest time between sweeps; longer intervals are clamped to this
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Close every expired poll and post the results.
///
/// Returns how many polls were closed.
pub async fn sweep_once(engine: &PollEngine, gateway: &dyn Gateway, now: DateTime<Utc>) -> usize {
    let mut closed = 0;
    for (channel, poll_id) in engine.expired_polls(now) {
        match engine.force_close(&channel, poll_id, now) {
            Ok(notice) => {
                closed += 1;
                gateway::deliver(gateway, &notice).await;
            }
            Err(_) => {
                debug!(channel = %channel, poll_id = %poll_id, "poll closed before the sweep reached it");
            }
        }
    }
    closed
}

/// Run the sweep loop until `shutdown` flips to true or its sender is dropped.
///
/// The first sweep happens one full interval after start. `interval` is
/// capped at [`MAX_SWEEP_INTERVAL`].
pub async fn sweep_loop(
    engine: Arc<PollEngine>,
    gateway: DynGateway,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    if interval > MAX_SWEEP_INTERVAL {
        warn!(
            requested_secs = interval.as_secs(),
            max_secs = MAX_SWEEP_INTERVAL.as_secs(),
            "sweep interval too long, clamping"
        );
    }
    let interval = interval.min(MAX_SWEEP_INTERVAL);
    let now = tokio::time::Instant::now();
    let first = now.checked_add(interval).unwrap_or(now);
    let mut tick = tokio::time::interval_at(first, interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = shutdown.changed() => {
                break;
            }
        }

        if *shutdown.borrow() {
            break;
        }

        let closed = sweep_once(&engine, gateway.as_ref(), Utc::now()).await;
        if closed > 0 {
            let stats = engine.stats();
            info!(
                closed,
                active_polls = stats.active_polls,
                "expired polls closed"
            );
        }
    }

    debug!("poll sweeper stopped");
}

/// Handle to a running sweeper task
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Spawn the sweeper on the current tokio runtime
    pub fn spawn(engine: Arc<PollEngine>, gateway: DynGateway, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!(interval_secs = interval.as_secs_f64(), "starting poll sweeper");
        let task = tokio::spawn(sweep_loop(engine, gateway, interval, shutdown_rx));
        Self { shutdown_tx, task }
    }

    /// Whether the sweeper task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the sweeper to stop and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "poll sweeper task failed");
        }
    }
}
