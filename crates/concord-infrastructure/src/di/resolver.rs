//! Key store resolution through the provider registry

use concord_application::ports::registry::{
    KeyStoreProviderConfig, list_key_store_providers, resolve_key_store_provider,
};
use concord_domain::error::{Error, Result};
use concord_domain::ports::infrastructure::SharedKeyStore;
use tracing::info;

use crate::config::KeyStoreConfig;

/// Build the configured key store
pub fn resolve_key_store(config: &KeyStoreConfig) -> Result<SharedKeyStore> {
    let mut provider_config =
        KeyStoreProviderConfig::new(config.provider.as_str()).with_timeout_ms(config.timeout_ms);
    if let Some(url) = &config.redis_url {
        provider_config = provider_config.with_uri(url.as_str());
    }

    let store = resolve_key_store_provider(&provider_config).map_err(Error::configuration)?;
    info!(
        provider = store.provider_name(),
        available = ?available_providers(),
        "key store resolved"
    );
    Ok(store)
}

/// Names of every registered key store provider
pub fn available_providers() -> Vec<&'static str> {
    list_key_store_providers()
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}
