//! Unified Shutdown Coordinator
//!
//! Two jobs share this type:
//!
//! - process lifecycle: a root `CancellationToken` for hierarchical
//!   shutdown signalling and a `TaskTracker` that every background task
//!   (heartbeats, scheduled jobs) is spawned on
//! - cluster-wide cleanup: [`ShutdownCoordinator::run_once`] runs a cleanup
//!   action on at most one of the instances terminating at the same time,
//!   guarded by a non-waiting lock
//!
//! ## Usage
//!
//! ```rust,ignore
//! let coordinator = ShutdownCoordinator::new(locks, ShutdownSettings::default());
//! coordinator.register_hook("flush-sessions", || async { flush().await });
//! coordinator.spawn("cleanup", async move { /* ... */ });
//!
//! // Graceful shutdown with timeout
//! let completed = coordinator.shutdown(Duration::from_secs(30)).await;
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use concord_domain::error::{Error, Result};
use concord_domain::value_objects::WaitPolicy;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::lock_manager::LockManager;

/// Lock key guarding cluster-wide shutdown cleanup
pub const DEFAULT_SHUTDOWN_LOCK_KEY: &str = "lock:shutdown:cleanup";

/// Lease of the shutdown cleanup lock
pub const DEFAULT_SHUTDOWN_LEASE: Duration = Duration::from_secs(5 * 60);

/// What [`ShutdownCoordinator::run_once`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// This instance ran the cleanup
    Executed,
    /// Another instance holds the cleanup lock
    AlreadyRunning,
    /// The active profile is configured to skip cleanup
    Skipped,
}

/// Settings for cluster-wide cleanup
#[derive(Debug, Clone)]
pub struct ShutdownSettings {
    /// Lock key guarding cleanup
    pub lock_key: String,
    /// Lease of the cleanup lock
    pub lease: Duration,
    /// Active deployment profile
    pub profile: Option<String>,
    /// Profiles that never run cleanup
    pub skip_profiles: Vec<String>,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            lock_key: DEFAULT_SHUTDOWN_LOCK_KEY.to_string(),
            lease: DEFAULT_SHUTDOWN_LEASE,
            profile: None,
            skip_profiles: Vec::new(),
        }
    }
}

impl ShutdownSettings {
    /// Whether the active profile is in the skip list
    pub fn skips_cleanup(&self) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|p| self.skip_profiles.iter().any(|s| s.eq_ignore_ascii_case(p)))
    }
}

type HookFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

struct ShutdownHook {
    name: String,
    run: HookFn,
}

/// Unified shutdown coordinator for background tasks and cleanup hooks
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel_token: CancellationToken,
    task_tracker: TaskTracker,
    locks: Arc<LockManager>,
    settings: Arc<ShutdownSettings>,
    hooks: Arc<Mutex<Vec<ShutdownHook>>>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(locks: Arc<LockManager>, settings: ShutdownSettings) -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
            locks,
            settings: Arc::new(settings),
            hooks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a child cancellation token for a service
    ///
    /// Child tokens are cancelled when the parent is cancelled.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Get the root cancellation token
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Tracker every background task is spawned on
    pub fn tracker(&self) -> TaskTracker {
        self.task_tracker.clone()
    }

    /// Cleanup settings
    pub fn settings(&self) -> &ShutdownSettings {
        &self.settings
    }

    /// Check if shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get the number of active tracked tasks
    pub fn active_tasks(&self) -> usize {
        self.task_tracker.len()
    }

    /// Number of registered cleanup hooks not yet run
    pub fn pending_hooks(&self) -> usize {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Spawn and track a background task
    pub fn spawn<F>(&self, name: &'static str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        debug!("[SHUTDOWN] Spawning tracked task: {}", name);
        self.task_tracker.spawn(future)
    }

    /// Spawn a task that receives a child cancellation token
    pub fn spawn_cancellable<F, Fut>(
        &self,
        name: &'static str,
        task_fn: F,
    ) -> JoinHandle<Fut::Output>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let token = self.child_token();
        let future = task_fn(token);
        self.spawn(name, future)
    }

    /// Register a cleanup action run by [`ShutdownCoordinator::shutdown`]
    ///
    /// Hooks run in registration order, on at most one instance.
    pub fn register_hook<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        debug!("[SHUTDOWN] Registered cleanup hook: {}", name);
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ShutdownHook {
                name,
                run: Box::new(move || hook().boxed()),
            });
    }

    /// Run `cleanup` unless another instance is already doing so.
    ///
    /// The cleanup lock is taken without waiting and released whatever the
    /// cleanup returns. A cleanup error is propagated after the release; a
    /// panic is reported as an internal error.
    pub async fn run_once<F, Fut>(&self, cleanup: F) -> Result<ShutdownOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.settings.skips_cleanup() {
            info!(
                "[SHUTDOWN] Cleanup skipped for profile {:?}",
                self.settings.profile
            );
            return Ok(ShutdownOutcome::Skipped);
        }

        let key = self.settings.lock_key.as_str();
        let guard = match self
            .locks
            .acquire(key, self.settings.lease, WaitPolicy::NoWait)
            .await
        {
            Ok(guard) => guard,
            Err(Error::LockNotAcquired { .. }) => {
                info!("[SHUTDOWN] Cleanup already running on another instance");
                return Ok(ShutdownOutcome::AlreadyRunning);
            }
            Err(e) => return Err(e),
        };

        info!("[SHUTDOWN] Running cluster cleanup under {}", key);
        let outcome = AssertUnwindSafe(cleanup()).catch_unwind().await;

        if let Err(e) = self.locks.release(&guard).await {
            warn!("[SHUTDOWN] Failed to release cleanup lock: {}", e);
        }

        match outcome {
            Ok(Ok(())) => Ok(ShutdownOutcome::Executed),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::internal("shutdown cleanup panicked")),
        }
    }

    /// Initiate graceful shutdown
    ///
    /// 1. Cancels all tokens (signals tasks to stop)
    /// 2. Runs registered hooks through [`ShutdownCoordinator::run_once`]
    /// 3. Closes the task tracker and waits for tracked tasks (with timeout)
    ///
    /// Returns `true` if all tasks completed before timeout, `false` otherwise.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        info!(
            "[SHUTDOWN] Initiating graceful shutdown with {}s timeout, {} active tasks",
            timeout.as_secs(),
            self.task_tracker.len()
        );

        self.cancel_token.cancel();

        let hooks = std::mem::take(
            &mut *self.hooks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if !hooks.is_empty() {
            match self.run_once(|| run_hooks(hooks)).await {
                Ok(outcome) => info!("[SHUTDOWN] Cleanup hooks: {:?}", outcome),
                Err(e) => warn!("[SHUTDOWN] Cleanup hooks failed: {}", e),
            }
        }

        self.task_tracker.close();

        tokio::select! {
            () = self.task_tracker.wait() => {
                info!("[SHUTDOWN] All tasks completed cleanly");
                true
            }
            () = tokio::time::sleep(timeout) => {
                warn!(
                    "[SHUTDOWN] Timeout reached, {} tasks still active",
                    self.task_tracker.len()
                );
                false
            }
        }
    }

    /// Wait until shutdown is initiated
    pub async fn wait_for_shutdown(&self) {
        self.cancel_token.cancelled().await;
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("shutting_down", &self.is_shutting_down())
            .field("active_tasks", &self.active_tasks())
            .field("pending_hooks", &self.pending_hooks())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Run every hook, continuing past failures; the first error is returned
async fn run_hooks(hooks: Vec<ShutdownHook>) -> Result<()> {
    let mut first_error = None;
    for hook in hooks {
        debug!("[SHUTDOWN] Running cleanup hook: {}", hook.name);
        if let Err(e) = (hook.run)().await {
            warn!("[SHUTDOWN] Cleanup hook {} failed: {}", hook.name, e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Shared shutdown coordinator for use across the application
pub type SharedShutdownCoordinator = Arc<ShutdownCoordinator>;
