//! Key Store Provider Registry
//!
//! Auto-registration system for key store providers.
//! Providers register themselves via `#[linkme::distributed_slice]` and are
//! discovered at runtime by iterating [`KEY_STORE_PROVIDERS`].

use std::collections::HashMap;
use std::sync::Arc;

use concord_domain::ports::KeyStore;

/// Configuration for key store provider creation
///
/// Providers use what they need and ignore the rest.
#[derive(Debug, Clone, Default)]
pub struct KeyStoreProviderConfig {
    /// Provider name (e.g., "memory", "redis", "null")
    pub provider: String,
    /// Connection URI (for networked stores)
    pub uri: Option<String>,
    /// Per-command timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

impl KeyStoreProviderConfig {
    /// Create a new config with the given provider name
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Set the URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the command timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Add extra configuration
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Registry entry for key store providers
pub struct KeyStoreProviderEntry {
    /// Unique provider name
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create provider instance
    pub factory: fn(&KeyStoreProviderConfig) -> Result<Arc<dyn KeyStore>, String>,
}

#[linkme::distributed_slice]
pub static KEY_STORE_PROVIDERS: [KeyStoreProviderEntry] = [..];

/// Resolve key store provider by name from registry
///
/// # Returns
/// * `Ok(Arc<dyn KeyStore>)` - Created provider instance
/// * `Err(String)` - Error message if provider not found or creation failed
pub fn resolve_key_store_provider(
    config: &KeyStoreProviderConfig,
) -> Result<Arc<dyn KeyStore>, String> {
    let provider_name = &config.provider;

    if let Some(entry) = KEY_STORE_PROVIDERS
        .iter()
        .find(|entry| entry.name == provider_name)
    {
        return (entry.factory)(config);
    }

    let available: Vec<&str> = KEY_STORE_PROVIDERS.iter().map(|e| e.name).collect();
    Err(format!(
        "Unknown key store provider '{provider_name}'. Available providers: {available:?}"
    ))
}

/// List all registered key store providers as `(name, description)`
pub fn list_key_store_providers() -> Vec<(&'static str, &'static str)> {
    KEY_STORE_PROVIDERS
        .iter()
        .map(|e| (e.name, e.description))
        .collect()
}
