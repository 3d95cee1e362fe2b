//! Null key store for wiring tests
//!
//! Every conditional write succeeds and nothing is ever stored, so locks
//! are always granted and rate limits never trip. Never use it where
//! mutual exclusion matters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use concord_domain::error::Result;
use concord_domain::ports::KeyStore;
use concord_domain::value_objects::LockMode;

/// Key store that accepts everything and stores nothing
///
/// # Example
///
/// ```rust
/// use concord_providers::key_store::NullKeyStore;
///
/// let store = NullKeyStore::new();
/// // All writes succeed but nothing is kept
/// ```
#[derive(Debug, Clone, Default)]
pub struct NullKeyStore;

impl NullKeyStore {
    /// Create a new null key store
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyStore for NullKeyStore {
    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn compare_and_delete(&self, _key: &str, _expected: &str) -> Result<bool> {
        Ok(true)
    }

    async fn compare_and_extend(&self, _key: &str, _expected: &str, _ttl: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn refresh(&self, _key: &str, _ttl: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn increment_with_expiry(&self, _key: &str, _ttl: Duration) -> Result<i64> {
        // Every request looks like the first of its window
        Ok(1)
    }

    async fn acquire_mode(
        &self,
        _key: &str,
        _mode: LockMode,
        _token: &str,
        _ttl: Duration,
    ) -> Result<bool> {
        Ok(true)
    }

    async fn release_member(&self, _key: &str, _token: &str) -> Result<bool> {
        Ok(true)
    }

    async fn extend_member(&self, _key: &str, _token: &str, _ttl: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn remaining_ttl(&self, _key: &str) -> Result<Option<Duration>> {
        Ok(None)
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use concord_application::ports::registry::{
    KEY_STORE_PROVIDERS, KeyStoreProviderConfig, KeyStoreProviderEntry,
};

/// Factory function for creating null key store instances.
fn null_key_store_factory(
    _config: &KeyStoreProviderConfig,
) -> std::result::Result<Arc<dyn KeyStore>, String> {
    Ok(Arc::new(NullKeyStore::new()))
}

#[linkme::distributed_slice(KEY_STORE_PROVIDERS)]
static NULL_PROVIDER: KeyStoreProviderEntry = KeyStoreProviderEntry {
    name: "null",
    description: "No-op key store (wiring tests only)",
    factory: null_key_store_factory,
};
