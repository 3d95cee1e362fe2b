//! Domain Value Objects
//!
//! | Value Object | Description |
//! |--------------|-------------|
//! | [`WaitPolicy`] | How long an acquire may wait |
//! | [`FailStrategy`] | What happens when a lock is not acquired |
//! | [`LockMode`] | Read or write access to a shared lock |
//! | [`LockOptions`] | Lease, wait and heartbeat settings for `with_lock` |
//! | [`RateLimitDimension`] | Identity a counter is keyed on |
//! | [`RequestContext`] | Caller identity of an inbound request |
//! | [`RateLimitDecision`] | Outcome of a rate limit check |
//! | [`RateLimitPolicy`] | Declarative per-endpoint limit |

/// Lock value objects
pub mod lock;
/// Rate limit value objects
pub mod rate_limit;

pub use lock::{FailStrategy, LockMode, LockOptions, WaitPolicy};
pub use rate_limit::{
    RateLimitDecision, RateLimitDimension, RateLimitPolicy, RequestContext,
    build_rate_limit_key, user_agent_fingerprint,
};
