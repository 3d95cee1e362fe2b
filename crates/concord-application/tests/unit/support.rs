//! Shared test doubles

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use concord_application::use_cases::{LeaseRenewer, LockManager};
use concord_domain::error::{Error, Result};
use concord_domain::ports::infrastructure::SharedKeyStore;
use concord_domain::ports::{KeyStore, LockGuard, LockProvider};
use concord_domain::value_objects::{LockMode, WaitPolicy};
use concord_providers::key_store::MemoryKeyStore;

/// Fresh in-memory store behind the port
pub fn memory_store() -> (Arc<MemoryKeyStore>, SharedKeyStore) {
    let store = Arc::new(MemoryKeyStore::new());
    let shared: SharedKeyStore = store.clone();
    (store, shared)
}

/// Lock manager over a fresh in-memory store
pub fn memory_locks() -> (Arc<MemoryKeyStore>, Arc<LockManager>) {
    let (store, shared) = memory_store();
    (store, Arc::new(LockManager::new(shared)))
}

/// Renewer over `locks` with its own tracker
pub fn renewer_for(locks: &Arc<LockManager>) -> LeaseRenewer {
    LeaseRenewer::new(locks.clone())
}

/// Store whose every call fails as if the server were down
#[derive(Debug, Default)]
pub struct FailingStore;

fn down<T>() -> Result<T> {
    Err(Error::store_unavailable("connection refused"))
}

#[async_trait]
impl KeyStore for FailingStore {
    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool> {
        down()
    }

    async fn compare_and_delete(&self, _key: &str, _expected: &str) -> Result<bool> {
        down()
    }

    async fn compare_and_extend(&self, _key: &str, _expected: &str, _ttl: Duration) -> Result<bool> {
        down()
    }

    async fn refresh(&self, _key: &str, _ttl: Duration) -> Result<bool> {
        down()
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        down()
    }

    async fn increment_with_expiry(&self, _key: &str, _ttl: Duration) -> Result<i64> {
        down()
    }

    async fn acquire_mode(
        &self,
        _key: &str,
        _mode: LockMode,
        _token: &str,
        _ttl: Duration,
    ) -> Result<bool> {
        down()
    }

    async fn release_member(&self, _key: &str, _token: &str) -> Result<bool> {
        down()
    }

    async fn extend_member(&self, _key: &str, _token: &str, _ttl: Duration) -> Result<bool> {
        down()
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        down()
    }

    async fn remaining_ttl(&self, _key: &str) -> Result<Option<Duration>> {
        down()
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

/// Lock provider that counts renew calls before delegating
#[derive(Debug)]
pub struct CountingLocks {
    pub inner: Arc<LockManager>,
    pub renew_calls: AtomicUsize,
}

impl CountingLocks {
    pub fn new(inner: Arc<LockManager>) -> Self {
        Self {
            inner,
            renew_calls: AtomicUsize::new(0),
        }
    }

    pub fn renew_calls(&self) -> usize {
        self.renew_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LockProvider for CountingLocks {
    async fn acquire_lock(&self, key: &str, lease: Duration, wait: WaitPolicy) -> Result<LockGuard> {
        self.inner.acquire(key, lease, wait).await
    }

    async fn release_lock(&self, guard: &LockGuard) -> Result<bool> {
        self.inner.release(guard).await
    }

    async fn renew_lock(&self, key: &str, token: &str, lease: Duration) -> Result<bool> {
        self.renew_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.renew(key, token, lease).await
    }
}
