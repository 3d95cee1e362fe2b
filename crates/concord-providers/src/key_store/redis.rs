//! Redis key store provider
//!
//! Distributed key store for multi-instance deployments.
//!
//! | Operation | Redis |
//! |-----------|-------|
//! | `set_if_absent` | `SET key value NX PX ttl` |
//! | `compare_and_delete` | Lua: `GET` == token → `DEL` |
//! | `compare_and_extend` | Lua: `GET` == token → `PEXPIRE` |
//! | `refresh` | `PEXPIRE` |
//! | `exists` | `EXISTS` |
//! | `increment_with_expiry` | Lua: `INCR`, `PEXPIRE` when the count is 1 |
//! | `acquire_mode` | Lua: `HSET mode token` on an absent key, or add a reader |
//! | `release_member` | Lua: `HDEL token`, `DEL` after the last member |
//! | `extend_member` | Lua: `HEXISTS token` → `PEXPIRE` unless already longer |
//!
//! A read-write lock is a hash holding a `mode` field plus one field per
//! member token.
//!
//! A single `ConnectionManager` is created on first use and shared by every
//! call; it multiplexes commands and reconnects after connection loss. Each
//! command is bounded by the configured timeout.
//!
//! ## Example
//!
//! ```ignore
//! use concord_providers::key_store::RedisKeyStore;
//!
//! let store = RedisKeyStore::new("redis://localhost:6379")?
//!     .with_timeout(Duration::from_millis(500));
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use concord_domain::error::{Error, Result};
use concord_domain::ports::KeyStore;
use concord_domain::value_objects::LockMode;
use redis::aio::ConnectionManager;
use redis::{Client, RedisResult, Script};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::constants::{
    LUA_ACQUIRE_MODE, LUA_COMPARE_AND_DELETE, LUA_COMPARE_AND_EXTEND, LUA_EXTEND_MEMBER,
    LUA_INCREMENT_WITH_EXPIRY, LUA_RELEASE_MEMBER, REDIS_DEFAULT_TIMEOUT_MS, REDIS_DEFAULT_URL,
};

/// Redis key store provider
#[derive(Clone)]
pub struct RedisKeyStore {
    client: Client,
    url: String,
    timeout: Duration,
    connection: Arc<OnceCell<ConnectionManager>>,
    compare_and_delete: Arc<Script>,
    compare_and_extend: Arc<Script>,
    increment_with_expiry: Arc<Script>,
    acquire_mode: Arc<Script>,
    release_member: Arc<Script>,
    extend_member: Arc<Script>,
}

impl RedisKeyStore {
    /// Create a new Redis key store with connection string
    ///
    /// No connection is opened until the first command.
    pub fn new(connection_string: &str) -> Result<Self> {
        let client = Client::open(connection_string).map_err(|e| {
            Error::store_unavailable_with_source(
                format!("Failed to create Redis client: {e}"),
                e,
            )
        })?;

        Ok(Self {
            client,
            url: connection_string.to_string(),
            timeout: Duration::from_millis(REDIS_DEFAULT_TIMEOUT_MS),
            connection: Arc::new(OnceCell::new()),
            compare_and_delete: Arc::new(Script::new(LUA_COMPARE_AND_DELETE)),
            compare_and_extend: Arc::new(Script::new(LUA_COMPARE_AND_EXTEND)),
            increment_with_expiry: Arc::new(Script::new(LUA_INCREMENT_WITH_EXPIRY)),
            acquire_mode: Arc::new(Script::new(LUA_ACQUIRE_MODE)),
            release_member: Arc::new(Script::new(LUA_RELEASE_MEMBER)),
            extend_member: Arc::new(Script::new(LUA_EXTEND_MEMBER)),
        })
    }

    /// Create a new Redis key store with host and port
    pub fn with_host_port(host: &str, port: u16) -> Result<Self> {
        Self::new(&format!("redis://{host}:{port}"))
    }

    /// Bound every command by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the Redis server address description (credentials stripped)
    pub fn server_address(&self) -> String {
        match (self.url.split_once("://"), self.url.rsplit_once('@')) {
            (Some((scheme, _)), Some((_, host))) => format!("{scheme}://{host}"),
            _ => self.url.clone(),
        }
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                debug!(url = %self.server_address(), "connecting to redis");
                self.timed("CONNECT", ConnectionManager::new(self.client.clone()))
                    .await
            })
            .await?;
        Ok(conn.clone())
    }

    async fn timed<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::store_unavailable_with_source(
                format!("Redis {op} failed: {e}"),
                e,
            )),
            Err(_) => Err(Error::store_unavailable(format!(
                "Redis {op} timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyStore for RedisKeyStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = self
            .timed(
                "SET NX",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(reply.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted: i64 = self
            .timed(
                "compare-and-delete",
                self.compare_and_delete
                    .key(key)
                    .arg(expected)
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(deleted > 0)
    }

    async fn compare_and_extend(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let extended: i64 = self
            .timed(
                "compare-and-extend",
                self.compare_and_extend
                    .key(key)
                    .arg(expected)
                    .arg(ttl_millis(ttl))
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(extended > 0)
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let updated: i64 = self
            .timed(
                "PEXPIRE",
                redis::cmd("PEXPIRE")
                    .arg(key)
                    .arg(ttl_millis(ttl))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(updated > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let count: i64 = self
            .timed("EXISTS", redis::cmd("EXISTS").arg(key).query_async(&mut conn))
            .await?;
        Ok(count > 0)
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64> {
        let mut conn = self.connection().await?;
        self.timed(
            "INCR",
            self.increment_with_expiry
                .key(key)
                .arg(ttl_millis(ttl))
                .invoke_async(&mut conn),
        )
        .await
    }

    async fn acquire_mode(
        &self,
        key: &str,
        mode: LockMode,
        token: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.connection().await?;
        let joined: i64 = self
            .timed(
                "acquire-mode",
                self.acquire_mode
                    .key(key)
                    .arg(mode.as_str())
                    .arg(token)
                    .arg(ttl_millis(ttl))
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(joined > 0)
    }

    async fn release_member(&self, key: &str, token: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let released: i64 = self
            .timed(
                "release-member",
                self.release_member
                    .key(key)
                    .arg(token)
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(released > 0)
    }

    async fn extend_member(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let extended: i64 = self
            .timed(
                "extend-member",
                self.extend_member
                    .key(key)
                    .arg(token)
                    .arg(ttl_millis(ttl))
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(extended > 0)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        self.timed("GET", redis::cmd("GET").arg(key).query_async(&mut conn))
            .await
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.connection().await?;
        let millis: i64 = self
            .timed("PTTL", redis::cmd("PTTL").arg(key).query_async(&mut conn))
            .await?;
        // -2: no such key, -1: no expiry
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    fn provider_name(&self) -> &str {
        "redis"
    }
}

impl std::fmt::Debug for RedisKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKeyStore")
            .field("server", &self.server_address())
            .field("timeout", &self.timeout)
            .field("connected", &self.connection.initialized())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use concord_application::ports::registry::{
    KEY_STORE_PROVIDERS, KeyStoreProviderConfig, KeyStoreProviderEntry,
};

/// Factory function for creating Redis key store instances.
fn redis_key_store_factory(
    config: &KeyStoreProviderConfig,
) -> std::result::Result<Arc<dyn KeyStore>, String> {
    let uri = config.uri.as_deref().unwrap_or(REDIS_DEFAULT_URL);
    let timeout = Duration::from_millis(config.timeout_ms.unwrap_or(REDIS_DEFAULT_TIMEOUT_MS));

    let store = RedisKeyStore::new(uri)
        .map_err(|e| format!("Failed to create Redis key store: {e}"))?
        .with_timeout(timeout);

    Ok(Arc::new(store))
}

#[linkme::distributed_slice(KEY_STORE_PROVIDERS)]
static REDIS_PROVIDER: KeyStoreProviderEntry = KeyStoreProviderEntry {
    name: "redis",
    description: "Redis distributed key store",
    factory: redis_key_store_factory,
};
