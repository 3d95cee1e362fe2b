//! Infrastructure ports
//!
//! | Port | Description |
//! |------|-------------|
//! | [`KeyStore`] | Atomic primitives of the shared key-value store |
//! | [`LockProvider`] | Owner-token locks built on top of a key store |

/// Shared key-value store port
pub mod key_store;
/// Distributed lock provider port
pub mod lock;

pub use key_store::{KeyStore, SharedKeyStore};
pub use lock::{LockGuard, LockProvider, SharedLockProvider};
