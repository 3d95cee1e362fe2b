//! Distributed Lock Provider Port
//!
//! Defines the contract for owner-token lock coordination across instances.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::value_objects::{LockMode, WaitPolicy};

/// Lock guard returned when a lock is acquired
///
/// Holding a guard does not keep the lock alive: once `lease` has elapsed
/// without a renew, another instance may take the key over. Releasing a
/// guard after that point is safe and simply reports `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockGuard {
    /// Lock key
    pub key: String,
    /// Unique token for this lock acquisition
    pub token: String,
    /// Lease granted at acquisition
    pub lease: Duration,
    /// Wall-clock acquisition time
    pub acquired_at: DateTime<Utc>,
    /// Read/write mode; `None` for a plain exclusive lock
    pub mode: Option<LockMode>,
}

impl LockGuard {
    /// Build a guard for a freshly acquired key
    pub fn new<K: Into<String>, T: Into<String>>(key: K, token: T, lease: Duration) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
            lease,
            acquired_at: Utc::now(),
            mode: None,
        }
    }

    /// Mark the guard as a member of a read-write lock
    pub fn with_mode(mut self, mode: LockMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// First characters of the token, safe to put in logs
    pub fn token_prefix(&self) -> &str {
        let end = self
            .token
            .char_indices()
            .nth(8)
            .map_or(self.token.len(), |(i, _)| i);
        &self.token[..end]
    }
}

/// Distributed lock provider interface
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Acquire `key` for `lease`, waiting according to `wait`
    async fn acquire_lock(&self, key: &str, lease: Duration, wait: WaitPolicy)
    -> Result<LockGuard>;

    /// Release a lock if still owned by the guard's token
    ///
    /// `Ok(false)` means the lease already expired or was taken over.
    async fn release_lock(&self, guard: &LockGuard) -> Result<bool>;

    /// Extend the lease of `key` if still owned by `token`
    async fn renew_lock(&self, key: &str, token: &str, lease: Duration) -> Result<bool>;

    /// Extend the lease held by `guard`
    ///
    /// Providers supporting read-write locks dispatch on `guard.mode`.
    async fn renew_guard(&self, guard: &LockGuard) -> Result<bool> {
        self.renew_lock(&guard.key, &guard.token, guard.lease).await
    }
}

/// Shared lock provider handle
pub type SharedLockProvider = Arc<dyn LockProvider>;
