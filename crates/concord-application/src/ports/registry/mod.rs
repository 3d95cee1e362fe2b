//! Provider Registry System
//!
//! Key store providers register themselves with the `linkme` crate at
//! compile time and are resolved by name at runtime.
//!
//! ```text
//! 1. Provider defines:  #[linkme::distributed_slice(KEY_STORE_PROVIDERS)]
//!                       static ENTRY: KeyStoreProviderEntry = ...
//! 2. Registry declares: #[linkme::distributed_slice]
//!                       pub static KEY_STORE_PROVIDERS: [Entry] = [..]
//! 3. Resolver queries:  KEY_STORE_PROVIDERS.iter()
//! 4. Config selects:    "provider = redis" → RedisKeyStore
//! ```
//!
//! ### Registering a Provider (in concord-providers)
//!
//! ```ignore
//! use concord_application::ports::registry::{KeyStoreProviderEntry, KEY_STORE_PROVIDERS};
//!
//! #[linkme::distributed_slice(KEY_STORE_PROVIDERS)]
//! static MEMORY_PROVIDER: KeyStoreProviderEntry = KeyStoreProviderEntry {
//!     name: "memory",
//!     description: "In-process key store",
//!     factory: |_config| Ok(Arc::new(MemoryKeyStore::new())),
//! };
//! ```
//!
//! Binaries must link `concord-providers` (`extern crate concord_providers;`)
//! for the entries to be present.

/// Key store provider registry
pub mod key_store;

pub use key_store::{
    KEY_STORE_PROVIDERS, KeyStoreProviderConfig, KeyStoreProviderEntry, list_key_store_providers,
    resolve_key_store_provider,
};
