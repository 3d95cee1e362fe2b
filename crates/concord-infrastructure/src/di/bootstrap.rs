//! Coordination context bootstrap
//!
//! ## Usage
//!
//! ```rust,ignore
//! let context = init_context(ConfigLoader::new().load()?)?;
//!
//! let report = context
//!     .with_lock("job:flush", &context.lock_options(), || async { flush().await })
//!     .await?;
//!
//! let id = context.ids().next();
//! ```

use std::future::Future;
use std::sync::Arc;

use concord_application::use_cases::{
    CoordinatedJob, IdGenerator, LeaseRenewer, LockManager, LockService, RateLimitGuard,
    RateLimiter, ScheduledJobRunner, SharedShutdownCoordinator, ShutdownCoordinator,
};
use concord_domain::error::Result;
use concord_domain::ports::infrastructure::SharedKeyStore;
use concord_domain::value_objects::{LockOptions, RateLimitPolicy};
use tokio::task::JoinHandle;
use tracing::info;

use super::resolver::resolve_key_store;
use crate::config::{AppConfig, IdGeneratorConfig};
use crate::infrastructure::host::local_ipv4;

/// Every coordination service of one process, built from one configuration
#[derive(Clone)]
pub struct CoordinationContext {
    /// Configuration the context was built from
    pub config: Arc<AppConfig>,

    store: SharedKeyStore,
    locks: Arc<LockManager>,
    renewer: LeaseRenewer,
    lock_service: LockService,
    rate_limiter: Arc<RateLimiter>,
    shutdown: SharedShutdownCoordinator,
    ids: Arc<IdGenerator>,
    job_runner: ScheduledJobRunner,
}

/// Build the coordination context from configuration
///
/// The key store is resolved by provider name from the registry; networked
/// stores connect lazily on first use.
pub fn init_context(config: AppConfig) -> Result<CoordinationContext> {
    let store = resolve_key_store(&config.key_store)?;

    let (retry_min, retry_max) = config.lock.retry_window();
    let locks = Arc::new(
        LockManager::new(Arc::clone(&store)).with_retry_window(retry_min, retry_max),
    );

    let shutdown = Arc::new(ShutdownCoordinator::new(
        Arc::clone(&locks),
        config.shutdown.settings(),
    ));
    // Heartbeats share the shutdown tracker so shutdown waits for them
    let renewer = LeaseRenewer::with_tracker(locks.clone(), shutdown.tracker());
    let lock_service = LockService::new(Arc::clone(&locks), renewer.clone());

    let rate_limiter =
        Arc::new(RateLimiter::new(Arc::clone(&store)).with_enabled(config.rate_limit.enabled));
    let ids = Arc::new(id_generator_from_config(&config.id_generator)?);
    let job_runner =
        ScheduledJobRunner::new(Arc::clone(&locks), renewer.clone(), config.jobs.lease())
            .with_heartbeat_fraction(config.lock.heartbeat_fraction)
            .with_page_size(config.jobs.page_size);

    info!(
        key_store = store.provider_name(),
        rate_limit_enabled = config.rate_limit.enabled,
        "coordination context initialized"
    );

    Ok(CoordinationContext {
        config: Arc::new(config),
        store,
        locks,
        renewer,
        lock_service,
        rate_limiter,
        shutdown,
        ids,
        job_runner,
    })
}

/// Build the id generator, resolving the host address when none is
/// configured
pub fn id_generator_from_config(config: &IdGeneratorConfig) -> Result<IdGenerator> {
    let host = config
        .host_ip
        .clone()
        .unwrap_or_else(|| local_ipv4().to_string());
    IdGenerator::new(config.location.as_str(), &host, &config.port)
}

impl CoordinationContext {
    /// Shared key store
    pub fn store(&self) -> &SharedKeyStore {
        &self.store
    }

    /// Lock manager
    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Heartbeat spawner
    pub fn renewer(&self) -> &LeaseRenewer {
        &self.renewer
    }

    /// `with_lock` service
    pub fn lock_service(&self) -> &LockService {
        &self.lock_service
    }

    /// Rate limiter
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Shutdown coordinator
    pub fn shutdown_coordinator(&self) -> &SharedShutdownCoordinator {
        &self.shutdown
    }

    /// Id generator
    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    /// Scheduled job runner
    pub fn job_runner(&self) -> &ScheduledJobRunner {
        &self.job_runner
    }

    /// Lock options from the configured defaults
    pub fn lock_options(&self) -> LockOptions {
        self.config.lock.options()
    }

    /// Run `section` under `key`; see [`LockService::with_lock`]
    pub async fn with_lock<T, F, Fut>(
        &self,
        key: &str,
        options: &LockOptions,
        section: F,
    ) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.lock_service.with_lock(key, options, section).await
    }

    /// Guard enforcing `policy`
    pub fn rate_limit_guard(&self, policy: RateLimitPolicy) -> RateLimitGuard {
        RateLimitGuard::new(Arc::clone(&self.rate_limiter), policy)
    }

    /// Guard enforcing the configured default policy
    pub fn default_rate_limit_guard(&self) -> RateLimitGuard {
        self.rate_limit_guard(self.config.rate_limit.default_policy())
    }

    /// Schedule `job` at the configured interval until shutdown
    pub fn spawn_job<J: CoordinatedJob>(&self, job: Arc<J>) -> JoinHandle<()> {
        self.job_runner
            .spawn(job, self.config.jobs.interval(), &self.shutdown)
    }

    /// Coordinated shutdown with the configured grace period
    pub async fn shutdown(&self) -> bool {
        self.shutdown
            .shutdown(self.config.shutdown.grace_period())
            .await
    }
}

impl std::fmt::Debug for CoordinationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinationContext")
            .field("key_store", &self.store.provider_name())
            .field("rate_limit_enabled", &self.rate_limiter.is_enabled())
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}
