//! Composition root
//!
//! ```text
//! AppConfig → resolver (linkme registry) → Arc<dyn KeyStore>
//!                                               │
//!     LockManager ─ LeaseRenewer ─ LockService ─┤
//!     RateLimiter ─ ShutdownCoordinator ────────┤
//!     IdGenerator ─ ScheduledJobRunner ─────────┘→ CoordinationContext
//! ```
//!
//! Everything is built once from configuration and passed down explicitly;
//! there are no global statics.

pub mod bootstrap;
pub mod resolver;

pub use bootstrap::{CoordinationContext, id_generator_from_config, init_context};
pub use resolver::resolve_key_store;
