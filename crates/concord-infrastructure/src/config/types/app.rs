//! Main application configuration

use serde::{Deserialize, Serialize};

use super::coordination::{
    IdGeneratorConfig, JobsConfig, KeyStoreConfig, LockConfig, RateLimitConfig, ShutdownConfig,
};
use super::logging::LoggingConfig;

/// Root configuration
///
/// Every section has defaults, so an empty file is a valid configuration
/// for a single instance on the in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging
    pub logging: LoggingConfig,
    /// Key store provider selection
    pub key_store: KeyStoreConfig,
    /// Lock defaults
    pub lock: LockConfig,
    /// Rate limit defaults
    pub rate_limit: RateLimitConfig,
    /// Shutdown cleanup
    pub shutdown: ShutdownConfig,
    /// Id generation
    pub id_generator: IdGeneratorConfig,
    /// Scheduled jobs
    pub jobs: JobsConfig,
}
