//! # Concord
//!
//! Distributed coordination for horizontally scaled services that share one
//! key store:
//!
//! - owner-token locks with bounded waits and lease heartbeats
//! - fixed-window rate limiting keyed by user, IP or client fingerprint
//! - at-most-once cluster cleanup on shutdown
//! - short process-local identifiers
//! - scheduled batch jobs that run on one instance per tick
//!
//! ## Example
//!
//! ```ignore
//! use concord::infrastructure::{ConfigLoader, init_context};
//!
//! let context = init_context(ConfigLoader::new().load()?)?;
//! context
//!     .with_lock("job:flush", &context.lock_options(), || async { flush().await })
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - errors, value objects and the `KeyStore` port
//! - `application` - lock, heartbeat, rate limit, shutdown, id and job services
//! - `providers` - memory, Redis and null key stores
//! - `infrastructure` - configuration, logging and the composition root

use std::path::Path;

use tracing::info;

/// Domain layer - errors, value objects and ports
pub mod domain {
    pub use concord_domain::*;
}

/// Application layer - coordination services
pub mod application {
    pub use concord_application::*;
}

/// Provider layer - key store implementations
pub mod providers {
    pub use concord_providers::*;
}

/// Infrastructure layer - config, logging and bootstrap
pub mod infrastructure {
    pub use concord_infrastructure::*;
}

pub use concord_domain::{Error, Result};
pub use concord_infrastructure::{AppConfig, ConfigLoader, CoordinationContext, init_context};

/// Run the coordination node until a stop signal arrives.
///
/// Loads configuration (explicit path or default locations), optionally
/// overrides the shutdown profile, initialises logging, builds the context,
/// logs a fresh instance id and performs coordinated shutdown on Ctrl-C or
/// SIGTERM.
pub async fn run(config_path: Option<&Path>, profile: Option<String>) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = config_path {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load()?;
    if profile.is_some() {
        config.shutdown.profile = profile;
    }

    concord_infrastructure::logging::init_logging(&config.logging)?;

    let context = init_context(config)?;
    let instance_id = context.ids().next_with_sub("ins");
    info!(
        instance_id = %instance_id,
        key_store = context.store().provider_name(),
        "concord node started"
    );

    let grace = context.config.shutdown.grace_period();
    let clean = concord_infrastructure::infrastructure::shutdown_on_signal(
        context.shutdown_coordinator(),
        grace,
    )
    .await?;
    info!(instance_id = %instance_id, clean, "concord node stopped");
    Ok(())
}
