//! Rate limit value objects
//!
//! Counter keys are derived from the request identity along one of four
//! dimensions. Derivation is pure: the same request context always yields
//! the same key, so every instance counts into the same window.
//!
//! | Dimension | Identity |
//! |-----------|----------|
//! | `USER` | authenticated user id |
//! | `IP` | client address (`X-Forwarded-For`, `X-Real-IP`, peer) |
//! | `IP_USER` | `ip:user_id` |
//! | `IP_USERAGENT` | `ip:` + 16 hex chars of the user agent digest |

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{
    FORWARDED_FOR_HEADER, KEY_SEPARATOR, RATE_LIMIT_KEY_PREFIX, REAL_IP_HEADER,
    USER_AGENT_FINGERPRINT_LEN, USER_AGENT_HEADER, USER_AGENT_MAX_LEN,
};
use crate::error::{Error, Result};

/// Identity dimension a counter is keyed on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RateLimitDimension {
    /// Authenticated user
    #[serde(rename = "USER")]
    User,
    /// Client address
    #[default]
    #[serde(rename = "IP")]
    Ip,
    /// Client address and user
    #[serde(rename = "IP_USER")]
    IpUser,
    /// Client address and user agent fingerprint
    #[serde(rename = "IP_USERAGENT")]
    IpUserAgent,
}

impl RateLimitDimension {
    /// Key segment for the dimension
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Ip => "IP",
            Self::IpUser => "IP_USER",
            Self::IpUserAgent => "IP_USERAGENT",
        }
    }

    /// Identity string for this dimension
    pub fn identity(&self, ctx: &RequestContext) -> Result<String> {
        match self {
            Self::User => ctx.require_user(*self).map(str::to_string),
            Self::Ip => ctx.require_ip(*self).map(str::to_string),
            Self::IpUser => {
                let ip = ctx.require_ip(*self)?;
                let user = ctx.require_user(*self)?;
                Ok(format!("{ip}{KEY_SEPARATOR}{user}"))
            }
            Self::IpUserAgent => {
                let ip = ctx.require_ip(*self)?;
                let fingerprint = user_agent_fingerprint(ctx.user_agent().unwrap_or_default());
                Ok(format!("{ip}{KEY_SEPARATOR}{fingerprint}"))
            }
        }
    }
}

impl std::fmt::Display for RateLimitDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RateLimitDimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "IP" => Ok(Self::Ip),
            "IP_USER" => Ok(Self::IpUser),
            "IP_USERAGENT" => Ok(Self::IpUserAgent),
            other => Err(Error::invalid_argument(format!(
                "unknown rate limit dimension '{other}'"
            ))),
        }
    }
}

/// The parts of an inbound request that identify its caller
///
/// Header names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HashMap<String, String>,
    peer_addr: Option<String>,
    user_id: Option<String>,
}

impl RequestContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header
    pub fn with_header<K: AsRef<str>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the socket peer address
    pub fn with_peer_addr<S: Into<String>>(mut self, addr: S) -> Self {
        self.peer_addr = Some(addr.into());
        self
    }

    /// Set the authenticated user id
    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Authenticated user id, if present and not blank
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// User agent header
    pub fn user_agent(&self) -> Option<&str> {
        self.header(USER_AGENT_HEADER)
    }

    /// Client address: first `X-Forwarded-For` entry, then `X-Real-IP`,
    /// then the socket peer.
    pub fn client_ip(&self) -> Option<&str> {
        let forwarded = self
            .header(FORWARDED_FOR_HEADER)
            .and_then(|v| v.split(',').next())
            .map(str::trim);
        let real_ip = self.header(REAL_IP_HEADER).map(str::trim);
        let peer = self.peer_addr.as_deref().map(str::trim);

        [forwarded, real_ip, peer]
            .into_iter()
            .flatten()
            .find(|ip| !ip.is_empty())
    }

    fn require_user(&self, dimension: RateLimitDimension) -> Result<&str> {
        self.user_id()
            .ok_or_else(|| Error::identity_missing(dimension.as_str()))
    }

    fn require_ip(&self, dimension: RateLimitDimension) -> Result<&str> {
        self.client_ip()
            .ok_or_else(|| Error::identity_missing(dimension.as_str()))
    }
}

/// Fingerprint of a user agent string.
///
/// The agent is cut to its first 100 characters, stripped to ASCII letters
/// and digits, hashed with SHA-256 and rendered as 16 lowercase hex chars.
pub fn user_agent_fingerprint(user_agent: &str) -> String {
    let sanitized: String = user_agent
        .chars()
        .take(USER_AGENT_MAX_LEN)
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let digest = Sha256::digest(sanitized.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(USER_AGENT_FINGERPRINT_LEN);
    encoded
}

/// Build the counter key for a request.
///
/// Layout: `rate_limit:{scope}:{DIMENSION}:{identity}`.
pub fn build_rate_limit_key(
    scope: &str,
    dimension: RateLimitDimension,
    ctx: &RequestContext,
) -> Result<String> {
    let identity = dimension.identity(ctx)?;
    Ok([
        RATE_LIMIT_KEY_PREFIX,
        scope,
        dimension.as_str(),
        identity.as_str(),
    ]
    .join(KEY_SEPARATOR))
}

/// Outcome of one rate limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Counter key that was consulted
    pub key: String,
    /// Post-increment count; `0` when the store was not reached
    pub count: i64,
    /// Configured limit
    pub limit: u64,
    /// Window length in seconds
    pub window_secs: u64,
    /// Set when the store failed and the request was admitted anyway
    pub degraded: bool,
}

impl RateLimitDecision {
    /// Decision from a post-increment counter value
    pub fn from_count(key: String, count: i64, limit: u64, window_secs: u64) -> Self {
        let allowed = u64::try_from(count).map_or(true, |c| c <= limit);
        Self {
            allowed,
            key,
            count,
            limit,
            window_secs,
            degraded: false,
        }
    }

    /// Fail-open decision used when the store is unreachable
    pub fn degraded(key: String, limit: u64, window_secs: u64) -> Self {
        Self {
            allowed: true,
            key,
            count: 0,
            limit,
            window_secs,
            degraded: true,
        }
    }

    /// Requests left in the current window
    pub fn remaining(&self) -> u64 {
        let used = u64::try_from(self.count).unwrap_or(0);
        self.limit.saturating_sub(used)
    }

    /// Convert a rejection into [`Error::RateLimited`]
    pub fn into_result(self) -> Result<Self> {
        if self.allowed {
            Ok(self)
        } else {
            Err(Error::rate_limited(self.key, self.limit, self.window_secs))
        }
    }
}

/// Declarative limit attached to an endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Scope segment of the key (usually the endpoint name)
    pub scope: String,
    /// Identity dimension
    #[serde(default)]
    pub dimension: RateLimitDimension,
    /// Requests admitted per window
    pub limit: u64,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitPolicy {
    /// Policy for `scope`
    pub fn new<S: Into<String>>(
        scope: S,
        dimension: RateLimitDimension,
        limit: u64,
        window_secs: u64,
    ) -> Self {
        Self {
            scope: scope.into(),
            dimension,
            limit,
            window_secs,
        }
    }

    /// Window as a duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Counter key for a request under this policy
    pub fn key_for(&self, ctx: &RequestContext) -> Result<String> {
        build_rate_limit_key(&self.scope, self.dimension, ctx)
    }
}
