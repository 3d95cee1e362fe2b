//! Use Cases - Coordination service implementations

pub mod id_generator;
pub mod lease_renewer;
pub mod lock_manager;
pub mod lock_service;
pub mod rate_limiter;
pub mod scheduled_job;
pub mod shutdown;

pub use id_generator::IdGenerator;
pub use lease_renewer::{HeartbeatHandle, LeaseRenewer};
pub use lock_manager::{LockManager, new_owner_token};
pub use lock_service::LockService;
pub use rate_limiter::{RateLimitGuard, RateLimiter};
pub use scheduled_job::{
    CoordinatedJob, DEFAULT_JOB_PAGE_SIZE, JobStats, ScheduledJobRunner, TickReport,
};
pub use shutdown::{
    DEFAULT_SHUTDOWN_LEASE, DEFAULT_SHUTDOWN_LOCK_KEY, SharedShutdownCoordinator,
    ShutdownCoordinator, ShutdownOutcome, ShutdownSettings,
};
