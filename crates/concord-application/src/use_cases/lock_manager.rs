//! Distributed lock manager
//!
//! Owner-token locks on top of the key store's atomic primitives:
//!
//! - acquire: `set_if_absent(key, token, lease)`, polled with jitter when
//!   the wait policy allows it
//! - release: `compare_and_delete(key, token)`
//! - renew: `compare_and_extend(key, token, lease)`
//!
//! Read-write locks use the store's member primitives instead: readers
//! share a key, a writer holds it alone, and the key lives as long as any
//! member keeps renewing it.
//!
//! A guard whose lease ran out is not an error on release; the store simply
//! reports that the token no longer matches.

use std::time::Duration;

use async_trait::async_trait;
use concord_domain::constants::{LOCK_RETRY_MAX_MS, LOCK_RETRY_MIN_MS};
use concord_domain::error::{Error, Result};
use concord_domain::ports::{LockGuard, LockProvider};
use concord_domain::ports::infrastructure::SharedKeyStore;
use concord_domain::value_objects::{LockMode, WaitPolicy};
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Lock manager backed by a shared key store
#[derive(Clone)]
pub struct LockManager {
    store: SharedKeyStore,
    retry_min: Duration,
    retry_max: Duration,
}

impl LockManager {
    /// Create a lock manager with the default 20-100 ms retry jitter
    pub fn new(store: SharedKeyStore) -> Self {
        Self {
            store,
            retry_min: Duration::from_millis(LOCK_RETRY_MIN_MS),
            retry_max: Duration::from_millis(LOCK_RETRY_MAX_MS),
        }
    }

    /// Override the retry jitter window
    pub fn with_retry_window(mut self, min: Duration, max: Duration) -> Self {
        self.retry_min = min;
        self.retry_max = max.max(min);
        self
    }

    /// Underlying key store
    pub fn store(&self) -> &SharedKeyStore {
        &self.store
    }

    /// Acquire `key` for `lease`.
    ///
    /// See [`LockManager::acquire_with_cancel`].
    pub async fn acquire(&self, key: &str, lease: Duration, wait: WaitPolicy) -> Result<LockGuard> {
        self.acquire_with_cancel(key, lease, wait, &CancellationToken::new())
            .await
    }

    /// Acquire `key` for `lease`, giving up when `cancel` fires.
    ///
    /// A fresh owner token is generated per call. Store failures abort the
    /// attempt immediately; only contention is retried.
    pub async fn acquire_with_cancel(
        &self,
        key: &str,
        lease: Duration,
        wait: WaitPolicy,
        cancel: &CancellationToken,
    ) -> Result<LockGuard> {
        self.acquire_inner(key, None, lease, wait, cancel).await
    }

    /// Acquire the read side of the read-write lock at `key`
    pub async fn acquire_read(
        &self,
        key: &str,
        lease: Duration,
        wait: WaitPolicy,
    ) -> Result<LockGuard> {
        self.acquire_mode(key, LockMode::Read, lease, wait).await
    }

    /// Acquire the write side of the read-write lock at `key`
    pub async fn acquire_write(
        &self,
        key: &str,
        lease: Duration,
        wait: WaitPolicy,
    ) -> Result<LockGuard> {
        self.acquire_mode(key, LockMode::Write, lease, wait).await
    }

    /// Acquire the read-write lock at `key` in `mode`
    pub async fn acquire_mode(
        &self,
        key: &str,
        mode: LockMode,
        lease: Duration,
        wait: WaitPolicy,
    ) -> Result<LockGuard> {
        self.acquire_mode_with_cancel(key, mode, lease, wait, &CancellationToken::new())
            .await
    }

    /// Acquire the read-write lock at `key` in `mode`, giving up when
    /// `cancel` fires
    pub async fn acquire_mode_with_cancel(
        &self,
        key: &str,
        mode: LockMode,
        lease: Duration,
        wait: WaitPolicy,
        cancel: &CancellationToken,
    ) -> Result<LockGuard> {
        self.acquire_inner(key, Some(mode), lease, wait, cancel).await
    }

    async fn acquire_inner(
        &self,
        key: &str,
        mode: Option<LockMode>,
        lease: Duration,
        wait: WaitPolicy,
        cancel: &CancellationToken,
    ) -> Result<LockGuard> {
        if lease.is_zero() {
            return Err(Error::invalid_argument(format!(
                "lock lease for '{key}' must be positive"
            )));
        }

        let token = new_owner_token();
        let started = Instant::now();
        let deadline = match wait {
            WaitPolicy::Bounded(budget) => Some(started + budget),
            WaitPolicy::NoWait | WaitPolicy::Forever => None,
        };

        loop {
            if cancel.is_cancelled() {
                debug!(key, "lock acquire cancelled");
                return Err(Error::lock_not_acquired(key, elapsed_ms(started)));
            }

            if self.try_acquire(key, mode, &token, lease).await? {
                let mut guard = LockGuard::new(key, token, lease);
                if let Some(mode) = mode {
                    guard = guard.with_mode(mode);
                }
                debug!(
                    key,
                    token = guard.token_prefix(),
                    mode = mode.map_or("exclusive", |m| m.as_str()),
                    elapsed_ms = elapsed_ms(started),
                    "lock acquired"
                );
                return Ok(guard);
            }

            let mut delay = self.jitter();
            match (wait, deadline) {
                (WaitPolicy::NoWait, _) => {
                    return Err(Error::lock_not_acquired(key, 0));
                }
                (_, Some(deadline)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        debug!(key, elapsed_ms = elapsed_ms(started), "lock wait budget exhausted");
                        return Err(Error::lock_not_acquired(key, elapsed_ms(started)));
                    }
                    delay = delay.min(remaining);
                }
                _ => {}
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(key, "lock acquire cancelled while waiting");
                    return Err(Error::lock_not_acquired(key, elapsed_ms(started)));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Release a lock if the guard still owns it.
    ///
    /// `Ok(false)` means the lease expired or another owner took over; the
    /// other owner's key is left untouched.
    pub async fn release(&self, guard: &LockGuard) -> Result<bool> {
        let released = match guard.mode {
            None => {
                self.store
                    .compare_and_delete(&guard.key, &guard.token)
                    .await?
            }
            Some(_) => self.store.release_member(&guard.key, &guard.token).await?,
        };
        if released {
            debug!(key = %guard.key, token = guard.token_prefix(), "lock released");
        } else {
            warn!(
                key = %guard.key,
                token = guard.token_prefix(),
                "lock was no longer owned at release"
            );
        }
        Ok(released)
    }

    /// Extend the lease of `key` if `token` still owns it
    pub async fn renew(&self, key: &str, token: &str, lease: Duration) -> Result<bool> {
        self.store.compare_and_extend(key, token, lease).await
    }

    /// Extend the lease held by `guard`, plain or read-write
    pub async fn renew_held(&self, guard: &LockGuard) -> Result<bool> {
        match guard.mode {
            None => self.renew(&guard.key, &guard.token, guard.lease).await,
            Some(_) => {
                self.store
                    .extend_member(&guard.key, &guard.token, guard.lease)
                    .await
            }
        }
    }

    /// Whether anyone currently holds `key` (diagnostics only)
    pub async fn is_locked(&self, key: &str) -> Result<bool> {
        self.store.exists(key).await
    }

    async fn try_acquire(
        &self,
        key: &str,
        mode: Option<LockMode>,
        token: &str,
        lease: Duration,
    ) -> Result<bool> {
        match mode {
            None => self.store.set_if_absent(key, token, lease).await,
            Some(mode) => self.store.acquire_mode(key, mode, token, lease).await,
        }
    }

    fn jitter(&self) -> Duration {
        let min = u64::try_from(self.retry_min.as_millis()).unwrap_or(LOCK_RETRY_MIN_MS);
        let max = u64::try_from(self.retry_max.as_millis()).unwrap_or(LOCK_RETRY_MAX_MS);
        Duration::from_millis(rand::rng().random_range(min..=max.max(min)))
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("store", &self.store.provider_name())
            .field("retry_min", &self.retry_min)
            .field("retry_max", &self.retry_max)
            .finish()
    }
}

#[async_trait]
impl LockProvider for LockManager {
    async fn acquire_lock(
        &self,
        key: &str,
        lease: Duration,
        wait: WaitPolicy,
    ) -> Result<LockGuard> {
        self.acquire(key, lease, wait).await
    }

    async fn release_lock(&self, guard: &LockGuard) -> Result<bool> {
        self.release(guard).await
    }

    async fn renew_lock(&self, key: &str, token: &str, lease: Duration) -> Result<bool> {
        self.renew(key, token, lease).await
    }

    async fn renew_guard(&self, guard: &LockGuard) -> Result<bool> {
        self.renew_held(guard).await
    }
}

/// Random 128-bit owner token, hyphenless
pub fn new_owner_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
