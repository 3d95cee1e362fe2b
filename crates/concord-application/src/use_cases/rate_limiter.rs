//! Rate Limiting
//!
//! Fixed-window counters in the shared key store. The first request of a
//! window creates the counter with a TTL equal to the window; every later
//! request in the window increments it, admitted or not. A request is
//! admitted iff its post-increment count is within the limit, so up to
//! twice the limit may pass around a window boundary.
//!
//! When the store cannot be reached the limiter fails open: the request is
//! admitted and the decision is flagged as degraded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use concord_domain::error::Result;
use concord_domain::ports::infrastructure::SharedKeyStore;
use concord_domain::value_objects::{RateLimitDecision, RateLimitPolicy, RequestContext};
use tracing::{debug, warn};

/// Fixed-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedKeyStore,
    enabled: bool,
}

impl RateLimiter {
    /// Enabled limiter over `store`
    pub fn new(store: SharedKeyStore) -> Self {
        Self {
            store,
            enabled: true,
        }
    }

    /// Enable or disable limiting; a disabled limiter admits everything
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether limits are enforced
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count one request against `key` and decide whether it may proceed
    pub async fn allow(&self, key: &str, limit: u64, window: Duration) -> RateLimitDecision {
        let window_secs = window.as_secs();
        if !self.enabled {
            return RateLimitDecision::from_count(key.to_string(), 0, limit, window_secs);
        }

        let ttl = window.max(Duration::from_millis(1));
        match self.store.increment_with_expiry(key, ttl).await {
            Ok(count) => {
                let decision =
                    RateLimitDecision::from_count(key.to_string(), count, limit, window_secs);
                if !decision.allowed {
                    debug!(key, count, limit, "rate limit exceeded");
                }
                decision
            }
            Err(e) => {
                warn!(key, error = %e, "rate limit store unavailable, admitting request");
                RateLimitDecision::degraded(key.to_string(), limit, window_secs)
            }
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &self.store.provider_name())
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Per-endpoint guard applying a [`RateLimitPolicy`] to inbound requests
///
/// # Example
///
/// ```ignore
/// let guard = RateLimitGuard::new(limiter, RateLimitPolicy::new("login", RateLimitDimension::Ip, 5, 60));
/// let response = guard.wrap(&ctx, || async { handle_login().await }).await?;
/// ```
#[derive(Clone, Debug)]
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
    policy: RateLimitPolicy,
}

impl RateLimitGuard {
    /// Guard `policy` with `limiter`
    pub fn new(limiter: Arc<RateLimiter>, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }

    /// Policy enforced by this guard
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Count the request and return the decision.
    ///
    /// Fails with `IdentityMissing` when the policy's dimension needs an
    /// identity the request lacks, and with `RateLimited` when rejected.
    pub async fn check(&self, ctx: &RequestContext) -> Result<RateLimitDecision> {
        if !self.limiter.is_enabled() {
            let key = self.policy.key_for(ctx).unwrap_or_default();
            return Ok(RateLimitDecision::from_count(
                key,
                0,
                self.policy.limit,
                self.policy.window_secs,
            ));
        }

        let key = self.policy.key_for(ctx)?;
        self.limiter
            .allow(&key, self.policy.limit, self.policy.window())
            .await
            .into_result()
    }

    /// Run `handler` only if the request is admitted
    pub async fn wrap<T, F, Fut>(&self, ctx: &RequestContext, handler: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.check(ctx).await?;
        handler().await
    }
}
