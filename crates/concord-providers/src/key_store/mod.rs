//! Key Store Provider Implementations
//!
//! ## Available Providers
//!
//! | Provider | Type | Description |
//! |----------|------|-------------|
//! | [`NullKeyStore`] | Testing | Accepts everything, stores nothing |
//! | [`MemoryKeyStore`] | Local | In-process map with per-key deadlines |
//! | [`RedisKeyStore`] | Distributed | Redis-backed for multi-instance |
//!
//! ## Provider Selection Guide
//!
//! - **Wiring tests**: `NullKeyStore`
//! - **Single instance / tests**: `MemoryKeyStore`
//! - **Multi instance**: `RedisKeyStore`

#[cfg(feature = "keystore-memory")]
pub mod memory;
pub mod null;
#[cfg(feature = "keystore-redis")]
pub mod redis;

#[cfg(feature = "keystore-memory")]
pub use memory::MemoryKeyStore;
pub use null::NullKeyStore;
#[cfg(feature = "keystore-redis")]
pub use redis::RedisKeyStore;
