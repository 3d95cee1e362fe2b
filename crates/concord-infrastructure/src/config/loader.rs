//! Configuration loader
//!
//! Loads [`AppConfig`] from defaults, a TOML file and environment variables
//! with Figment, then validates it. Invalid configuration fails fast at
//! startup instead of surfacing later as a lock or rate limit anomaly.

use std::env;
use std::path::{Path, PathBuf};

use concord_domain::error::{Error, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};

use crate::config::AppConfig;
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME,
};
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Sources are merged in this order (later sources override earlier):
    /// 1. `AppConfig::default()`
    /// 2. TOML configuration file (explicit path, else the first default
    ///    location that exists)
    /// 3. Environment variables, e.g. `CONCORD__KEY_STORE__PROVIDER=redis`
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        match &self.config_path {
            Some(path) if path.exists() => {
                figment = figment.merge(Toml::file(path));
                log_config_loaded(path, true);
            }
            Some(path) => {
                return Err(Error::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            None => {
                if let Some(path) = Self::find_default_config_path() {
                    figment = figment.merge(Toml::file(&path));
                    log_config_loaded(&path, true);
                }
            }
        }

        let prefix = format!("{}{CONFIG_ENV_SEPARATOR}", self.env_prefix);
        figment = figment.merge(Env::prefixed(&prefix).split(CONFIG_ENV_SEPARATOR));

        let config: AppConfig = figment
            .extract()
            .config_context("Failed to extract configuration")?;

        validate_app_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).config_context("Failed to serialize config to TOML")?;
        std::fs::write(path.as_ref(), toml_string).io_context("Failed to write config file")?;
        Ok(())
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;

        let mut candidates = vec![
            current_dir.join(DEFAULT_CONFIG_FILENAME),
            current_dir
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME),
        ];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME));
        }

        candidates.into_iter().find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate every configuration section
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    parse_log_level(&config.logging.level)?;
    validate_key_store_config(config)?;
    validate_lock_config(config)?;
    validate_rate_limit_config(config)?;
    validate_shutdown_config(config)?;
    validate_id_generator_config(config)?;
    validate_jobs_config(config)?;
    Ok(())
}

fn invalid(message: impl Into<String>) -> Error {
    Error::configuration(message)
}

fn validate_key_store_config(config: &AppConfig) -> Result<()> {
    let store = &config.key_store;
    if store.provider.trim().is_empty() {
        return Err(invalid("Key store provider cannot be empty"));
    }
    if store.timeout_ms == 0 {
        return Err(invalid("Key store timeout cannot be 0"));
    }
    Ok(())
}

fn validate_lock_config(config: &AppConfig) -> Result<()> {
    let lock = &config.lock;
    if lock.default_lease_secs == 0 {
        return Err(invalid("Lock lease cannot be 0"));
    }
    if !(lock.heartbeat_fraction > 0.0 && lock.heartbeat_fraction < 1.0) {
        return Err(invalid(format!(
            "Heartbeat fraction must be between 0 and 1 (exclusive), got {}",
            lock.heartbeat_fraction
        )));
    }
    if lock.retry_min_ms == 0 || lock.retry_min_ms > lock.retry_max_ms {
        return Err(invalid(format!(
            "Lock retry window {}..{} ms is invalid",
            lock.retry_min_ms, lock.retry_max_ms
        )));
    }
    Ok(())
}

fn validate_rate_limit_config(config: &AppConfig) -> Result<()> {
    let rate = &config.rate_limit;
    if !rate.enabled {
        return Ok(());
    }
    if rate.default_limit == 0 {
        return Err(invalid("Rate limit cannot be 0 when rate limiting is enabled"));
    }
    if rate.default_window_secs == 0 {
        return Err(invalid(
            "Rate limit window cannot be 0 when rate limiting is enabled",
        ));
    }
    if rate.scope.trim().is_empty() {
        return Err(invalid("Rate limit scope cannot be empty"));
    }
    Ok(())
}

fn validate_shutdown_config(config: &AppConfig) -> Result<()> {
    let shutdown = &config.shutdown;
    if shutdown.lock_key.trim().is_empty() {
        return Err(invalid("Shutdown lock key cannot be empty"));
    }
    if shutdown.lease_secs == 0 {
        return Err(invalid("Shutdown lock lease cannot be 0"));
    }
    Ok(())
}

fn validate_id_generator_config(config: &AppConfig) -> Result<()> {
    let ids = &config.id_generator;
    if ids.location.is_empty() {
        return Err(invalid("Id generator location cannot be empty"));
    }
    if ids.port.chars().count() < concord_domain::constants::ID_PORT_MIN_LEN {
        return Err(invalid(format!(
            "Id generator port '{}' must be at least {} characters",
            ids.port,
            concord_domain::constants::ID_PORT_MIN_LEN
        )));
    }
    Ok(())
}

fn validate_jobs_config(config: &AppConfig) -> Result<()> {
    let jobs = &config.jobs;
    if jobs.interval_secs == 0 {
        return Err(invalid("Job interval cannot be 0"));
    }
    if jobs.lease_secs == 0 {
        return Err(invalid("Job lease cannot be 0"));
    }
    if jobs.page_size == 0 {
        return Err(invalid("Job page size cannot be 0"));
    }
    Ok(())
}
