//! Lock value objects
//!
//! How long to wait for a lock, what to do when it cannot be taken, the
//! read/write modes of shared locks, and the option bundle `with_lock`
//! callers pass in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How long an acquire may wait for a held key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Try exactly once
    #[default]
    NoWait,
    /// Poll until the budget elapses
    Bounded(Duration),
    /// Poll until acquired or cancelled
    Forever,
}

impl WaitPolicy {
    /// Map the integer millisecond encoding used in configuration.
    ///
    /// `0` means try once, a positive value is a wait budget and a negative
    /// value waits forever.
    pub fn from_millis(wait_ms: i64) -> Self {
        match wait_ms {
            0 => Self::NoWait,
            ms if ms > 0 => Self::Bounded(Duration::from_millis(ms.unsigned_abs())),
            _ => Self::Forever,
        }
    }

    /// Inverse of [`WaitPolicy::from_millis`]
    pub fn as_millis(&self) -> i64 {
        match self {
            Self::NoWait => 0,
            Self::Bounded(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            Self::Forever => -1,
        }
    }
}

/// What `with_lock` does when the lock cannot be acquired
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailStrategy {
    /// Surface `LockNotAcquired` to the caller
    #[default]
    Reject,
    /// Skip the protected section and return `None`
    Skip,
    /// Run the protected section without the lock
    ProceedUnguarded,
}

impl FailStrategy {
    /// Configuration spelling of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Skip => "skip",
            Self::ProceedUnguarded => "proceed_unguarded",
        }
    }
}

impl std::fmt::Display for FailStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FailStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reject" | "exception" => Ok(Self::Reject),
            "skip" | "return_null" => Ok(Self::Skip),
            "proceed_unguarded" | "continue" => Ok(Self::ProceedUnguarded),
            other => Err(Error::invalid_argument(format!(
                "unknown fail strategy '{other}'"
            ))),
        }
    }
}

/// Access mode of a read-write lock
///
/// Any number of readers may hold a key together; a writer holds it alone.
/// Waiting writers get no priority over arriving readers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Shared with other readers
    Read,
    /// Exclusive against readers and writers
    Write,
}

impl LockMode {
    /// Spelling stored alongside the lock members
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    /// Whether a holder in `self` mode admits a newcomer in `other` mode
    pub fn admits(&self, other: LockMode) -> bool {
        matches!((self, other), (Self::Read, Self::Read))
    }
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LockMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            other => Err(Error::invalid_argument(format!("unknown lock mode '{other}'"))),
        }
    }
}

/// Options for a lock-protected section
///
/// # Example
///
/// ```
/// use concord_domain::value_objects::{FailStrategy, LockOptions, WaitPolicy};
/// use std::time::Duration;
///
/// let opts = LockOptions::new(Duration::from_secs(30))
///     .with_wait(WaitPolicy::NoWait)
///     .with_fail_strategy(FailStrategy::Skip);
/// assert_eq!(opts.heartbeat_interval(), Some(Duration::from_millis(7500)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LockOptions {
    /// Lease requested from the store
    pub lease: Duration,
    /// Wait policy for the acquire
    pub wait: WaitPolicy,
    /// Behaviour when the lock is not acquired
    pub fail_strategy: FailStrategy,
    /// Fraction of the lease between heartbeats; `None` disables renewal
    pub heartbeat_fraction: Option<f64>,
    /// Read/write mode; `None` takes a plain exclusive lock
    pub mode: Option<LockMode>,
}

impl LockOptions {
    /// Default heartbeat fraction (renew four times per lease)
    pub const DEFAULT_HEARTBEAT_FRACTION: f64 = 0.25;

    /// Options with the given lease and default everything else
    pub fn new(lease: Duration) -> Self {
        Self {
            lease,
            wait: WaitPolicy::NoWait,
            fail_strategy: FailStrategy::Reject,
            heartbeat_fraction: Some(Self::DEFAULT_HEARTBEAT_FRACTION),
            mode: None,
        }
    }

    /// Set the wait policy
    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Set the fail strategy
    pub fn with_fail_strategy(mut self, strategy: FailStrategy) -> Self {
        self.fail_strategy = strategy;
        self
    }

    /// Renew every `fraction` of the lease
    pub fn with_heartbeat_fraction(mut self, fraction: f64) -> Self {
        self.heartbeat_fraction = Some(fraction);
        self
    }

    /// Take the lock as a read-write lock in `mode`
    pub fn with_mode(mut self, mode: LockMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Do not start a heartbeat
    pub fn without_heartbeat(mut self) -> Self {
        self.heartbeat_fraction = None;
        self
    }

    /// Heartbeat interval derived from the lease, if renewal is enabled
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_fraction
            .filter(|f| *f > 0.0 && *f < 1.0)
            .map(|f| self.lease.mul_f64(f))
    }
}
