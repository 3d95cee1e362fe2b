//! Application Layer - Concord
//!
//! Coordination services built on the domain's [`KeyStore`] port. Every
//! service here is stateless apart from the store handle it was built with,
//! so any number of instances can run the same code against one store.
//!
//! ## Use Cases
//!
//! | Service | Purpose |
//! |---------|---------|
//! | [`LockManager`] | Owner-token locks with bounded waits |
//! | [`LeaseRenewer`] | Background lease heartbeats |
//! | [`LockService`] | `with_lock` wrapper: acquire, heartbeat, run, release |
//! | [`RateLimiter`] / [`RateLimitGuard`] | Fixed-window request limits |
//! | [`ShutdownCoordinator`] | Task lifecycle and at-most-once cleanup |
//! | [`IdGenerator`] | Local short identifiers |
//! | [`ScheduledJobRunner`] | Lock-guarded paginated batch ticks |
//!
//! ## Ports
//!
//! - `ports::registry`: linkme slice providers register their key stores in
//!
//! [`KeyStore`]: concord_domain::ports::KeyStore

pub mod ports;
pub mod use_cases;

pub use ports::*;
pub use use_cases::*;
