//! Key Store Port
//!
//! The atomic primitives every coordination component is built from. Each
//! operation is a single round trip that the store executes atomically for
//! one key; nothing here coordinates across keys.
//!
//! Implementations report every transport or server failure as
//! [`Error::StoreUnavailable`](crate::error::Error::StoreUnavailable) so
//! callers can decide between failing closed (locks) and failing open
//! (rate limits).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::LockMode;

/// Shared key-value store with per-key atomic operations
///
/// # Example
///
/// ```ignore
/// let created = store.set_if_absent("lock:job:flush", &token, Duration::from_secs(30)).await?;
/// if created {
///     // we own the key until the TTL runs out or we delete it
///     store.compare_and_delete("lock:job:flush", &token).await?;
/// }
/// ```
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Store `value` under `key` with `ttl` only if the key is absent.
    ///
    /// Returns `true` iff this call created the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Delete `key` only if its current value equals `expected`.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool>;

    /// Reset the TTL of `key` only if its current value equals `expected`.
    ///
    /// A `false` result leaves the key and its TTL untouched.
    async fn compare_and_extend(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool>;

    /// Reset the TTL of `key` if it exists, regardless of its value.
    async fn refresh(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Whether `key` currently exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically increment the counter at `key` and return the new value.
    ///
    /// The TTL is set only when the post-increment value is `1`, so a window
    /// opened by the first request is never extended by later ones.
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64>;

    /// Join the read-write lock at `key` as member `token` in `mode`.
    ///
    /// A writer needs the key absent; a reader also succeeds when the key
    /// already holds readers. On success the key lives for at least `ttl`.
    /// A key holding a plain value is never joined.
    async fn acquire_mode(&self, key: &str, mode: LockMode, token: &str, ttl: Duration)
    -> Result<bool>;

    /// Leave the read-write lock at `key`; the last member deletes the key.
    async fn release_member(&self, key: &str, token: &str) -> Result<bool>;

    /// Keep the read-write lock at `key` alive for at least `ttl` if `token`
    /// is a member. A shorter `ttl` never shortens the key.
    async fn extend_member(&self, key: &str, token: &str, ttl: Duration) -> Result<bool>;

    /// Current value of `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remaining lifetime of `key`; `None` when absent or without expiry
    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Name of the backing provider (for logging)
    fn provider_name(&self) -> &str;
}

/// Shared key store handle passed between components
pub type SharedKeyStore = Arc<dyn KeyStore>;
