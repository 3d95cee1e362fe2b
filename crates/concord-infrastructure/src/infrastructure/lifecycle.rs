//! Signal handling
//!
//! The process stops on Ctrl-C (SIGINT) or SIGTERM. Both lead to the same
//! coordinated shutdown: cancel tracked tasks, run cleanup hooks on one
//! instance, wait out the grace period.

use std::time::Duration;

use concord_application::use_cases::ShutdownCoordinator;
use concord_domain::error::Result;
use tracing::{info, warn};

use crate::error_ext::ErrorContext;

/// Resolve when the process is asked to stop
pub async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).io_context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.io_context("Failed to listen for Ctrl-C")?;
                info!("[SHUTDOWN] Received Ctrl-C");
            }
            _ = sigterm.recv() => {
                info!("[SHUTDOWN] Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .io_context("Failed to listen for Ctrl-C")?;
        info!("[SHUTDOWN] Received Ctrl-C");
    }

    Ok(())
}

/// Wait for a stop signal, then shut `coordinator` down.
///
/// Returns whether every tracked task finished within `grace`.
pub async fn shutdown_on_signal(coordinator: &ShutdownCoordinator, grace: Duration) -> Result<bool> {
    tokio::select! {
        result = wait_for_signal() => result?,
        () = coordinator.wait_for_shutdown() => {
            info!("[SHUTDOWN] Shutdown requested programmatically");
        }
    }

    let clean = coordinator.shutdown(grace).await;
    if !clean {
        warn!("[SHUTDOWN] Some tasks were still running after {:?}", grace);
    }
    Ok(clean)
}
