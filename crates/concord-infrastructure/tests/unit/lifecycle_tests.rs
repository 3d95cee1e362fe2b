//! Lifecycle tests

use std::sync::Arc;
use std::time::Duration;

use concord_application::use_cases::{LockManager, ShutdownCoordinator, ShutdownSettings};
use concord_infrastructure::infrastructure::{local_ipv4, shutdown_on_signal};
use concord_providers::key_store::MemoryKeyStore;

#[tokio::test]
async fn test_programmatic_shutdown_without_signal() {
    let locks = Arc::new(LockManager::new(Arc::new(MemoryKeyStore::new())));
    let coordinator = ShutdownCoordinator::new(locks, ShutdownSettings::default());

    let trigger = coordinator.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.token().cancel();
    });

    let clean = shutdown_on_signal(&coordinator, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(clean);
    assert!(coordinator.is_shutting_down());
}

#[test]
fn test_local_ipv4_is_never_unspecified() {
    assert!(!local_ipv4().is_unspecified());
}
