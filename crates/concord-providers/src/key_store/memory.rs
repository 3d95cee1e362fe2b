//! In-memory key store
//!
//! Single-process implementation of the key store port on a `DashMap`.
//! Each operation runs under the map's per-shard lock for its key, which
//! gives the same per-key atomicity the Redis provider gets from the
//! server. Expired entries are treated as absent; they are dropped when
//! their key is touched again and by a sweep that runs every
//! [`MEMORY_SWEEP_EVERY`] operations, so keys that are never reused do not
//! accumulate.
//!
//! Deadlines use `tokio::time::Instant`, so tests running with a paused
//! clock observe TTL expiry deterministically. A TTL too large to
//! represent as a deadline stores the key without expiry.
//!
//! ## Example
//!
//! ```ignore
//! use concord_providers::key_store::MemoryKeyStore;
//!
//! let store = MemoryKeyStore::new();
//! assert!(store.set_if_absent("k", "v", Duration::from_secs(1)).await?);
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use concord_domain::error::{Error, Result};
use concord_domain::ports::KeyStore;
use concord_domain::value_objects::LockMode;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use crate::constants::MEMORY_SWEEP_EVERY;

#[derive(Debug, Clone)]
enum Payload {
    /// Plain value (lock tokens, counters)
    Text(String),
    /// Members of a read-write lock
    Members {
        mode: LockMode,
        owners: HashSet<String>,
    },
}

#[derive(Debug, Clone)]
struct StoredValue {
    payload: Payload,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn text(value: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self {
            payload: Payload::Text(value.into()),
            expires_at: now.checked_add(ttl),
        }
    }

    fn members(mode: LockMode, owner: &str, now: Instant, ttl: Duration) -> Self {
        Self {
            payload: Payload::Members {
                mode,
                owners: HashSet::from([owner.to_string()]),
            },
            expires_at: now.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }

    fn holds(&self, expected: &str) -> bool {
        matches!(&self.payload, Payload::Text(value) if value == expected)
    }

    fn expire_after(&mut self, now: Instant, ttl: Duration) {
        self.expires_at = now.checked_add(ttl);
    }

    /// Push the deadline out to `now + ttl` unless it is already later
    fn extend_to_at_least(&mut self, now: Instant, ttl: Duration) {
        if let Some(current) = self.expires_at {
            self.expires_at = now.checked_add(ttl).map(|wanted| wanted.max(current));
        }
    }
}

/// In-process key store
#[derive(Debug, Clone)]
pub struct MemoryKeyStore {
    entries: Arc<DashMap<String, StoredValue>>,
    operations: Arc<AtomicU64>,
    sweep_every: u64,
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            operations: Arc::new(AtomicU64::new(0)),
            sweep_every: MEMORY_SWEEP_EVERY,
        }
    }
}

impl MemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep expired entries every `operations` calls
    pub fn with_sweep_every(mut self, operations: u64) -> Self {
        self.sweep_every = operations.max(1);
        self
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    /// Whether the store holds no live keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries held in memory, including expired ones not yet swept
    pub fn stored_entries(&self) -> usize {
        self.entries.len()
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, v| v.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "purged expired key store entries");
        }
    }

    /// Count an operation and sweep when due.
    ///
    /// Must run before the operation takes any entry lock: the sweep locks
    /// every shard.
    fn tick(&self) {
        let count = self.operations.fetch_add(1, Ordering::Relaxed);
        if count % self.sweep_every == self.sweep_every - 1 {
            self.purge_expired();
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    Ok(false)
                } else {
                    occupied.insert(StoredValue::text(value, now, ttl));
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::text(value, now, ttl));
                Ok(true)
            }
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        Ok(self
            .entries
            .remove_if(key, |_, v| v.is_live(now) && v.holds(expected))
            .is_some())
    }

    async fn compare_and_extend(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        Ok(match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) && entry.holds(expected) => {
                entry.expire_after(now, ttl);
                true
            }
            _ => false,
        })
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        Ok(match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) => {
                entry.expire_after(now, ttl);
                true
            }
            _ => false,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        Ok(self.entries.get(key).is_some_and(|e| e.is_live(now)))
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64> {
        self.tick();
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_live(now) => {
                let Payload::Text(value) = &mut occupied.get_mut().payload else {
                    return Err(Error::store_unavailable(format!(
                        "value at '{key}' is not an integer"
                    )));
                };
                let current: i64 = value.parse().map_err(|_| {
                    Error::store_unavailable(format!("value at '{key}' is not an integer"))
                })?;
                let next = current.checked_add(1).ok_or_else(|| {
                    Error::store_unavailable(format!("counter at '{key}' overflowed"))
                })?;
                *value = next.to_string();
                Ok(next)
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(StoredValue::text("1", now, ttl));
                Ok(1)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::text("1", now, ttl));
                Ok(1)
            }
        }
    }

    async fn acquire_mode(
        &self,
        key: &str,
        mode: LockMode,
        token: &str,
        ttl: Duration,
    ) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_live(now) => {
                let stored = occupied.get_mut();
                let joined = match &mut stored.payload {
                    Payload::Members { mode: held, owners } if held.admits(mode) => {
                        owners.insert(token.to_string());
                        true
                    }
                    _ => false,
                };
                if joined {
                    stored.extend_to_at_least(now, ttl);
                }
                Ok(joined)
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(StoredValue::members(mode, token, now, ttl));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::members(mode, token, now, ttl));
                Ok(true)
            }
        }
    }

    async fn release_member(&self, key: &str, token: &str) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_live(now) => {
                let (removed, emptied) = match &mut occupied.get_mut().payload {
                    Payload::Members { owners, .. } => (owners.remove(token), owners.is_empty()),
                    Payload::Text(_) => (false, false),
                };
                if emptied {
                    occupied.remove();
                }
                Ok(removed)
            }
            _ => Ok(false),
        }
    }

    async fn extend_member(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        self.tick();
        let now = Instant::now();
        Ok(match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) => {
                let member = matches!(
                    &entry.payload,
                    Payload::Members { owners, .. } if owners.contains(token)
                );
                if member {
                    entry.extend_to_at_least(now, ttl);
                }
                member
            }
            _ => false,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.tick();
        let now = Instant::now();
        match self.entries.get(key).filter(|e| e.is_live(now)) {
            None => Ok(None),
            Some(entry) => match &entry.payload {
                Payload::Text(value) => Ok(Some(value.clone())),
                Payload::Members { .. } => Err(Error::store_unavailable(format!(
                    "value at '{key}' is a read-write lock, not a string"
                ))),
            },
        }
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.tick();
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use concord_application::ports::registry::{
    KEY_STORE_PROVIDERS, KeyStoreProviderConfig, KeyStoreProviderEntry,
};

/// Factory function for creating in-memory key store instances.
fn memory_key_store_factory(
    _config: &KeyStoreProviderConfig,
) -> std::result::Result<Arc<dyn KeyStore>, String> {
    Ok(Arc::new(MemoryKeyStore::new()))
}

#[linkme::distributed_slice(KEY_STORE_PROVIDERS)]
static MEMORY_PROVIDER: KeyStoreProviderEntry = KeyStoreProviderEntry {
    name: "memory",
    description: "In-process key store (single instance, tests)",
    factory: memory_key_store_factory,
};
