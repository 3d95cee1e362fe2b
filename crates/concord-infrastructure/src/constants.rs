//! Infrastructure layer constants
//!
//! Defaults for configuration sections. Domain constants live in
//! `concord_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "concord.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "concord";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "CONCORD";

/// Separator between prefix and nested keys in environment variables
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the log filter
pub const LOG_FILTER_ENV: &str = "CONCORD_LOG";

/// File stem used when the log path has none
pub const LOG_FILE_STEM: &str = "concord";

// ============================================================================
// KEY STORE CONSTANTS
// ============================================================================

/// Provider used when none is configured
pub const DEFAULT_KEY_STORE_PROVIDER: &str = "memory";

/// Per-command timeout (milliseconds)
pub const DEFAULT_KEY_STORE_TIMEOUT_MS: u64 = 2_000;

// ============================================================================
// LOCK CONSTANTS
// ============================================================================

/// Default lock lease (seconds)
pub const DEFAULT_LOCK_LEASE_SECS: u64 = 30;

/// Default wait in the signed millisecond encoding (0 = do not wait)
pub const DEFAULT_LOCK_WAIT_MS: i64 = 0;

// ============================================================================
// RATE LIMIT CONSTANTS
// ============================================================================

/// Requests admitted per window when no policy overrides it
pub const DEFAULT_RATE_LIMIT: u64 = 100;

/// Window length (seconds)
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Scope of the default policy
pub const DEFAULT_RATE_SCOPE: &str = "default";

// ============================================================================
// SHUTDOWN CONSTANTS
// ============================================================================

/// Cleanup lock lease (seconds)
pub const DEFAULT_SHUTDOWN_LEASE_SECS: u64 = 300;

/// Time allowed for tracked tasks to finish (seconds)
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

// ============================================================================
// ID GENERATOR CONSTANTS
// ============================================================================

/// Two-character deployment location
pub const DEFAULT_ID_LOCATION: &str = "cn";

/// Service port recorded in ids
pub const DEFAULT_ID_PORT: &str = "8080";

// ============================================================================
// JOB CONSTANTS
// ============================================================================

/// Tick interval of scheduled jobs (seconds)
pub const DEFAULT_JOB_INTERVAL_SECS: u64 = 60;

/// Job lock lease (seconds)
pub const DEFAULT_JOB_LEASE_SECS: u64 = 300;

/// Records fetched per page
pub const DEFAULT_JOB_PAGE_SIZE: usize = 100;
