//! Application ports
//!
//! - **registry/** - Auto-registration system for key store providers

/// Provider registry for dynamic provider discovery
pub mod registry;

pub use registry::{
    KEY_STORE_PROVIDERS, KeyStoreProviderConfig, KeyStoreProviderEntry, list_key_store_providers,
    resolve_key_store_provider,
};
