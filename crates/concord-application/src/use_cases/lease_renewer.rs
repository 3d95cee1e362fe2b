//! Lease heartbeats
//!
//! A heartbeat is a background task that keeps extending a held lock's TTL
//! so a critical section may outlive its initial lease. Every heartbeat is
//! spawned on a shared [`TaskTracker`], so the process can tell whether any
//! are still running and wait for them during shutdown.
//!
//! The task never aborts the protected work. Ownership loss and store errors
//! are logged and the loop keeps ticking until the handle is stopped or
//! dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use concord_domain::constants::HEARTBEAT_MIN_INTERVAL_MS;
use concord_domain::error::{Error, Result};
use concord_domain::ports::LockGuard;
use concord_domain::ports::infrastructure::SharedLockProvider;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Spawns lease heartbeats for held locks
#[derive(Clone)]
pub struct LeaseRenewer {
    locks: SharedLockProvider,
    tracker: TaskTracker,
}

impl LeaseRenewer {
    /// Renewer with its own task tracker
    pub fn new(locks: SharedLockProvider) -> Self {
        Self::with_tracker(locks, TaskTracker::new())
    }

    /// Renewer spawning onto an existing tracker (usually the shutdown
    /// coordinator's)
    pub fn with_tracker(locks: SharedLockProvider, tracker: TaskTracker) -> Self {
        Self { locks, tracker }
    }

    /// Number of heartbeats that have not finished yet
    pub fn active_heartbeats(&self) -> usize {
        self.tracker.len()
    }

    /// Start renewing `guard` every `interval`.
    ///
    /// The interval must be shorter than the lease; intervals below 10 ms
    /// are raised to 10 ms.
    pub fn start(&self, guard: &LockGuard, interval: Duration) -> Result<HeartbeatHandle> {
        let interval = interval.max(Duration::from_millis(HEARTBEAT_MIN_INTERVAL_MS));
        if interval >= guard.lease {
            return Err(Error::invalid_argument(format!(
                "heartbeat interval {interval:?} must be shorter than lease {:?} for '{}'",
                guard.lease, guard.key
            )));
        }

        let cancel = CancellationToken::new();
        let state = Arc::new(HeartbeatState::default());
        state.running.store(true, Ordering::SeqCst);
        let task = self.tracker.spawn(heartbeat_loop(
            Arc::clone(&self.locks),
            guard.clone(),
            interval,
            cancel.clone(),
            Arc::clone(&state),
        ));

        debug!(
            key = %guard.key,
            token = guard.token_prefix(),
            interval_ms = interval.as_millis(),
            "heartbeat started"
        );

        Ok(HeartbeatHandle {
            key: guard.key.clone(),
            _drop_guard: cancel.clone().drop_guard(),
            cancel,
            task: Some(task),
            state,
        })
    }
}

impl std::fmt::Debug for LeaseRenewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseRenewer")
            .field("active_heartbeats", &self.tracker.len())
            .finish()
    }
}

#[derive(Debug, Default)]
struct HeartbeatState {
    renewals: AtomicU64,
    lost: AtomicBool,
    running: AtomicBool,
}

async fn heartbeat_loop(
    locks: SharedLockProvider,
    guard: LockGuard,
    interval: Duration,
    cancel: CancellationToken,
    state: Arc<HeartbeatState>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = locks.renew_guard(&guard) => outcome,
        };

        match outcome {
            Ok(true) => {
                state.renewals.fetch_add(1, Ordering::SeqCst);
                if state.lost.swap(false, Ordering::SeqCst) {
                    debug!(key = %guard.key, "heartbeat renewed again after ownership loss");
                }
            }
            Ok(false) => {
                if !state.lost.swap(true, Ordering::SeqCst) {
                    let error = Error::lock_ownership_lost(guard.key.as_str());
                    warn!(
                        key = %guard.key,
                        token = guard.token_prefix(),
                        error = %error,
                        "heartbeat lost lock ownership"
                    );
                }
            }
            Err(e) => {
                warn!(key = %guard.key, error = %e, "heartbeat renew failed");
            }
        }
    }

    state.running.store(false, Ordering::SeqCst);
    debug!(key = %guard.key, "heartbeat stopped");
}

/// Handle to a running heartbeat
///
/// Dropping the handle cancels the heartbeat; [`HeartbeatHandle::stop`]
/// additionally waits for the task to finish.
#[derive(Debug)]
pub struct HeartbeatHandle {
    key: String,
    cancel: CancellationToken,
    _drop_guard: DropGuard,
    task: Option<JoinHandle<()>>,
    state: Arc<HeartbeatState>,
}

impl HeartbeatHandle {
    /// Cancel the heartbeat and wait for its task to exit.
    ///
    /// Idempotent. Once this returns no further renew call is issued.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(key = %self.key, error = %e, "heartbeat task ended abnormally");
        }
    }

    /// Lock key this heartbeat renews
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the task is still looping
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Successful renewals so far
    pub fn renewals(&self) -> u64 {
        self.state.renewals.load(Ordering::SeqCst)
    }

    /// Whether the last renew found another owner
    pub fn ownership_lost(&self) -> bool {
        self.state.lost.load(Ordering::SeqCst)
    }
}
