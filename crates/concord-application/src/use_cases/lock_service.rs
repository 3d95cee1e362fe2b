//! Lock-protected sections
//!
//! [`LockService::with_lock`] is the explicit form of "run this under a
//! distributed lock": acquire, start a heartbeat, run the closure, stop the
//! heartbeat, release. The heartbeat is stopped and the lock released on
//! every exit path, including errors and panics inside the closure.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use concord_domain::error::{Error, Result};
use concord_domain::ports::LockGuard;
use concord_domain::value_objects::{FailStrategy, LockOptions};
use futures::FutureExt;
use tracing::{info, warn};

use super::lease_renewer::LeaseRenewer;
use super::lock_manager::LockManager;

/// Runs closures under distributed locks
///
/// `options.mode` selects a read-write lock; readers of the same key run
/// their sections concurrently.
#[derive(Clone, Debug)]
pub struct LockService {
    locks: Arc<LockManager>,
    renewer: LeaseRenewer,
}

impl LockService {
    /// Create the service from a lock manager and a renewer
    pub fn new(locks: Arc<LockManager>, renewer: LeaseRenewer) -> Self {
        Self { locks, renewer }
    }

    /// Lock manager used for acquire and release
    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Heartbeat spawner
    pub fn renewer(&self) -> &LeaseRenewer {
        &self.renewer
    }

    /// Run `section` while holding `key`.
    ///
    /// Returns `Ok(None)` only when the lock was not acquired and the fail
    /// strategy is [`FailStrategy::Skip`]. With
    /// [`FailStrategy::ProceedUnguarded`] the section runs without the lock.
    /// Panics inside the section are resumed after the lock is released.
    pub async fn with_lock<T, F, Fut>(
        &self,
        key: &str,
        options: &LockOptions,
        section: F,
    ) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let acquired = match options.mode {
            None => self.locks.acquire(key, options.lease, options.wait).await,
            Some(mode) => {
                self.locks
                    .acquire_mode(key, mode, options.lease, options.wait)
                    .await
            }
        };
        let guard = match acquired {
            Ok(guard) => guard,
            Err(e @ (Error::LockNotAcquired { .. } | Error::StoreUnavailable { .. })) => {
                return match options.fail_strategy {
                    FailStrategy::Reject => Err(e),
                    FailStrategy::Skip => {
                        info!(key, error = %e, "lock not acquired, skipping section");
                        Ok(None)
                    }
                    FailStrategy::ProceedUnguarded => {
                        warn!(key, error = %e, "lock not acquired, running section unguarded");
                        section().await.map(Some)
                    }
                };
            }
            Err(e) => return Err(e),
        };

        let mut heartbeat = match options.heartbeat_interval() {
            Some(interval) => match self.renewer.start(&guard, interval) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    self.release_quietly(&guard).await;
                    return Err(e);
                }
            },
            None => None,
        };

        let outcome = AssertUnwindSafe(section()).catch_unwind().await;

        if let Some(handle) = heartbeat.as_mut() {
            handle.stop().await;
        }
        self.release_quietly(&guard).await;

        match outcome {
            Ok(result) => result.map(Some),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn release_quietly(&self, guard: &LockGuard) {
        if let Err(e) = self.locks.release(guard).await {
            warn!(key = %guard.key, error = %e, "lock release failed; lease will expire");
        }
    }
}
