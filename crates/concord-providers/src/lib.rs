//! # Concord - Provider Implementations
//!
//! Implementations of the domain's [`KeyStore`] port. Each provider
//! registers itself in the application layer's `KEY_STORE_PROVIDERS`
//! linkme slice so the composition root can select one by name.
//!
//! ## Provider Categories
//!
//! | Category | Port | Implementations |
//! |----------|------|-----------------|
//! | Key Store | `KeyStore` | Redis, Memory, Null |
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! concord-providers = { version = "0.1", default-features = false, features = ["keystore-redis"] }
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use concord_providers::key_store::MemoryKeyStore;
//! use concord_providers::key_store::RedisKeyStore;
//! ```

pub use concord_domain::error::{Error, Result};
pub use concord_domain::ports::KeyStore;

/// Provider-specific constants
pub mod constants;

/// Key store provider implementations
///
/// Implements the `KeyStore` trait for store backends.
pub mod key_store;
