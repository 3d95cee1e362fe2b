//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the coordination core
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (simple form)
    #[error("I/O error: {source}")]
    IoSimple {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// I/O operation error (with context)
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The lock is held by another owner and could not be taken in time
    #[error("Lock not acquired: {key} (waited {waited_ms} ms)")]
    LockNotAcquired {
        /// Lock key
        key: String,
        /// Milliseconds spent waiting before giving up
        waited_ms: u64,
    },

    /// A renew found the key missing or owned by another token
    #[error("Lock ownership lost: {key}")]
    LockOwnershipLost {
        /// Lock key
        key: String,
    },

    /// A rate-limit key needs an identity the request does not carry
    #[error("Identity missing for rate limit dimension {dimension}")]
    IdentityMissing {
        /// Dimension that required the identity
        dimension: String,
    },

    /// A key store round trip failed
    #[error("Key store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The request exceeded its rate limit
    #[error("Rate limited: {key} (limit {limit} per {window_secs}s)")]
    RateLimited {
        /// Counter key that rejected the request
        key: String,
        /// Configured limit
        limit: u64,
        /// Window length in seconds
        window_secs: u64,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// Configuration-related error (simple form)
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Configuration-related error (with source)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A coordinated job failed
    #[error("Job {job} failed: {message}")]
    Job {
        /// Job name
        job: String,
        /// Description of the failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Coordination error creation methods
impl Error {
    /// Create a lock-not-acquired error
    pub fn lock_not_acquired<S: Into<String>>(key: S, waited_ms: u64) -> Self {
        Self::LockNotAcquired {
            key: key.into(),
            waited_ms,
        }
    }

    /// Create an ownership-lost error
    pub fn lock_ownership_lost<S: Into<String>>(key: S) -> Self {
        Self::LockOwnershipLost { key: key.into() }
    }

    /// Create an identity-missing error
    pub fn identity_missing<S: Into<String>>(dimension: S) -> Self {
        Self::IdentityMissing {
            dimension: dimension.into(),
        }
    }

    /// Create a rate-limited error
    pub fn rate_limited<S: Into<String>>(key: S, limit: u64, window_secs: u64) -> Self {
        Self::RateLimited {
            key: key.into(),
            limit,
            window_secs,
        }
    }

    /// Create a job error
    pub fn job<J: Into<String>, S: Into<String>>(job: J, message: S) -> Self {
        Self::Job {
            job: job.into(),
            message: message.into(),
        }
    }
}

// Store error creation methods
impl Error {
    /// Create a store-unavailable error
    pub fn store_unavailable<S: Into<String>>(message: S) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store-unavailable error with source
    pub fn store_unavailable_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// I/O error creation methods
impl Error {
    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error with source
    pub fn io_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Configuration error creation methods
impl Error {
    /// Create a configuration error (simple)
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a configuration error (with source)
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Internal and argument error creation methods
impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Classification
impl Error {
    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockNotAcquired { .. }
                | Self::StoreUnavailable { .. }
                | Self::RateLimited { .. }
                | Self::IoSimple { .. }
                | Self::Io { .. }
        )
    }

    /// HTTP status an outer web layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::LockNotAcquired { .. } => 409,
            Self::IdentityMissing { .. } | Self::InvalidArgument { .. } => 400,
            Self::StoreUnavailable { .. } => 503,
            _ => 500,
        }
    }
}
