//! Coordination configuration types
//!
//! One struct per section of `concord.toml`. Durations are stored as whole
//! seconds or milliseconds so the TOML stays plain; the helpers convert
//! them into the value objects the services take.

use std::time::Duration;

use concord_application::use_cases::ShutdownSettings;
use concord_domain::constants::{LOCK_RETRY_MAX_MS, LOCK_RETRY_MIN_MS};
use concord_domain::value_objects::{
    FailStrategy, LockOptions, RateLimitDimension, RateLimitPolicy, WaitPolicy,
};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ID_LOCATION, DEFAULT_ID_PORT, DEFAULT_JOB_INTERVAL_SECS, DEFAULT_JOB_LEASE_SECS,
    DEFAULT_JOB_PAGE_SIZE, DEFAULT_KEY_STORE_PROVIDER, DEFAULT_KEY_STORE_TIMEOUT_MS,
    DEFAULT_LOCK_LEASE_SECS, DEFAULT_LOCK_WAIT_MS, DEFAULT_RATE_LIMIT, DEFAULT_RATE_SCOPE,
    DEFAULT_RATE_WINDOW_SECS, DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_SHUTDOWN_LEASE_SECS,
};

// ============================================================================
// Key store
// ============================================================================

/// Key store provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreConfig {
    /// Registered provider name (`memory`, `redis`, `null`)
    pub provider: String,
    /// Redis connection URL
    pub redis_url: Option<String>,
    /// Per-command timeout
    pub timeout_ms: u64,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_KEY_STORE_PROVIDER.to_string(),
            redis_url: None,
            timeout_ms: DEFAULT_KEY_STORE_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// Locks
// ============================================================================

/// Defaults applied to `with_lock` when the caller gives none
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lease of a lock
    pub default_lease_secs: u64,
    /// `0` = no wait, `> 0` = wait up to this many ms, `< 0` = wait forever
    pub default_wait_ms: i64,
    /// Heartbeat interval as a fraction of the lease
    pub heartbeat_fraction: f64,
    /// What to do when the lock is not acquired
    pub fail_strategy: FailStrategy,
    /// Lower bound of the retry jitter
    pub retry_min_ms: u64,
    /// Upper bound of the retry jitter
    pub retry_max_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_lease_secs: DEFAULT_LOCK_LEASE_SECS,
            default_wait_ms: DEFAULT_LOCK_WAIT_MS,
            heartbeat_fraction: LockOptions::DEFAULT_HEARTBEAT_FRACTION,
            fail_strategy: FailStrategy::default(),
            retry_min_ms: LOCK_RETRY_MIN_MS,
            retry_max_ms: LOCK_RETRY_MAX_MS,
        }
    }
}

impl LockConfig {
    /// Default lease
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.default_lease_secs)
    }

    /// Default wait policy
    pub fn wait(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.default_wait_ms)
    }

    /// Lock options built from the defaults
    pub fn options(&self) -> LockOptions {
        LockOptions::new(self.lease())
            .with_wait(self.wait())
            .with_fail_strategy(self.fail_strategy)
            .with_heartbeat_fraction(self.heartbeat_fraction)
    }

    /// Retry jitter window
    pub fn retry_window(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.retry_min_ms),
            Duration::from_millis(self.retry_max_ms),
        )
    }
}

// ============================================================================
// Rate limiting
// ============================================================================

/// Rate limiter switch and default policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// When false every request is admitted without touching the store
    pub enabled: bool,
    /// Requests per window
    pub default_limit: u64,
    /// Window length
    pub default_window_secs: u64,
    /// Identity dimension
    pub default_dimension: RateLimitDimension,
    /// Scope of the default policy
    pub scope: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: DEFAULT_RATE_LIMIT,
            default_window_secs: DEFAULT_RATE_WINDOW_SECS,
            default_dimension: RateLimitDimension::default(),
            scope: DEFAULT_RATE_SCOPE.to_string(),
        }
    }
}

impl RateLimitConfig {
    /// Policy built from the defaults
    pub fn default_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(
            self.scope.clone(),
            self.default_dimension,
            self.default_limit,
            self.default_window_secs,
        )
    }
}

// ============================================================================
// Shutdown
// ============================================================================

/// Cluster cleanup and process shutdown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Lock key guarding cleanup
    pub lock_key: String,
    /// Cleanup lock lease
    pub lease_secs: u64,
    /// Profiles that never run cleanup
    pub skip_profiles: Vec<String>,
    /// Active deployment profile
    pub profile: Option<String>,
    /// Time allowed for tracked tasks to finish
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        let settings = ShutdownSettings::default();
        Self {
            lock_key: settings.lock_key,
            lease_secs: DEFAULT_SHUTDOWN_LEASE_SECS,
            skip_profiles: settings.skip_profiles,
            profile: settings.profile,
            grace_period_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl ShutdownConfig {
    /// Settings for the coordinator
    pub fn settings(&self) -> ShutdownSettings {
        ShutdownSettings {
            lock_key: self.lock_key.clone(),
            lease: Duration::from_secs(self.lease_secs),
            profile: self.profile.clone(),
            skip_profiles: self.skip_profiles.clone(),
        }
    }

    /// Grace period for tracked tasks
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

// ============================================================================
// Id generator
// ============================================================================

/// Inputs of the id layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdGeneratorConfig {
    /// Two-character location code
    pub location: String,
    /// IPv4 address recorded in ids; resolved from the hostname when unset
    pub host_ip: Option<String>,
    /// Service port (at least four characters)
    pub port: String,
}

impl Default for IdGeneratorConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_ID_LOCATION.to_string(),
            host_ip: None,
            port: DEFAULT_ID_PORT.to_string(),
        }
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// Scheduled job defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Tick interval
    pub interval_secs: u64,
    /// Lock lease per tick
    pub lease_secs: u64,
    /// Records per page for jobs that do not choose their own
    pub page_size: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_JOB_INTERVAL_SECS,
            lease_secs: DEFAULT_JOB_LEASE_SECS,
            page_size: DEFAULT_JOB_PAGE_SIZE,
        }
    }
}

impl JobsConfig {
    /// Tick interval
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Lock lease per tick
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}
