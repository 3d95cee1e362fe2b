//! Tests for the shutdown coordinator

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use concord_application::use_cases::{
    LockManager, ShutdownCoordinator, ShutdownOutcome, ShutdownSettings,
};
use concord_domain::error::Error;
use concord_domain::value_objects::WaitPolicy;

use crate::support::memory_locks;

fn coordinator(locks: Arc<LockManager>) -> ShutdownCoordinator {
    ShutdownCoordinator::new(locks, ShutdownSettings::default())
}

// ============================================================================
// run_once
// ============================================================================

#[tokio::test]
async fn test_run_once_executes_and_releases() {
    let (_, locks) = memory_locks();
    let coordinator = coordinator(Arc::clone(&locks));

    let outcome = coordinator.run_once(|| async { Ok(()) }).await.unwrap();
    assert_eq!(outcome, ShutdownOutcome::Executed);
    assert!(!locks.is_locked("lock:shutdown:cleanup").await.unwrap());
}

#[tokio::test]
async fn test_run_once_defers_to_running_instance() {
    let (_, locks) = memory_locks();
    let coordinator = coordinator(Arc::clone(&locks));
    let _other = locks
        .acquire(
            "lock:shutdown:cleanup",
            Duration::from_secs(300),
            WaitPolicy::NoWait,
        )
        .await
        .unwrap();

    let ran = AtomicUsize::new(0);
    let counter = &ran;
    let outcome = coordinator
        .run_once(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::AlreadyRunning);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

/// Two instances stopping together: the cleanup runs once
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_run_once_executes_once() {
    let (_, locks) = memory_locks();
    let ran = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let coordinator = coordinator(Arc::clone(&locks));
        let ran = Arc::clone(&ran);
        handles.push(tokio::spawn(async move {
            coordinator
                .run_once(move || async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(())
                })
                .await
                .unwrap()
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(outcomes.contains(&ShutdownOutcome::Executed));
    assert!(outcomes.contains(&ShutdownOutcome::AlreadyRunning));
}

#[tokio::test]
async fn test_run_once_skipped_for_profile() {
    let (_, locks) = memory_locks();
    let settings = ShutdownSettings {
        profile: Some("Local".to_string()),
        skip_profiles: vec!["local".to_string(), "test".to_string()],
        ..ShutdownSettings::default()
    };
    let coordinator = ShutdownCoordinator::new(locks, settings);

    let outcome = coordinator
        .run_once(|| async { Err(Error::internal("must not run")) })
        .await
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::Skipped);
}

#[tokio::test]
async fn test_run_once_propagates_error_after_release() {
    let (_, locks) = memory_locks();
    let coordinator = coordinator(Arc::clone(&locks));

    let err = coordinator
        .run_once(|| async { Err(Error::internal("flush failed")) })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal { .. }));
    assert!(!locks.is_locked("lock:shutdown:cleanup").await.unwrap());
}

#[tokio::test]
async fn test_run_once_reports_panic() {
    let (_, locks) = memory_locks();
    let coordinator = coordinator(Arc::clone(&locks));

    let err = coordinator
        .run_once(|| async {
            if cleanup_panics() {
                panic!("cleanup exploded");
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal { .. }));
    assert!(!locks.is_locked("lock:shutdown:cleanup").await.unwrap());
}

fn cleanup_panics() -> bool {
    true
}

// ============================================================================
// Process shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_runs_hooks_in_order_and_drains_tasks() {
    let (_, locks) = memory_locks();
    let coordinator = coordinator(locks);
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        coordinator.register_hook(name, move || async move {
            order.lock().unwrap().push(name);
            if name == "second" {
                return Err(Error::internal("second hook failed"));
            }
            Ok(())
        });
    }
    assert_eq!(coordinator.pending_hooks(), 3);

    let finished = Arc::new(AtomicUsize::new(0));
    {
        let finished = Arc::clone(&finished);
        coordinator.spawn_cancellable("worker", move |token| async move {
            token.cancelled().await;
            finished.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(coordinator.shutdown(Duration::from_secs(5)).await);
    assert!(coordinator.is_shutting_down());
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    assert_eq!(coordinator.pending_hooks(), 0);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.active_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_times_out_on_stuck_task() {
    let (_, locks) = memory_locks();
    let coordinator = coordinator(locks);
    coordinator.spawn("stuck", async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    });

    assert!(!coordinator.shutdown(Duration::from_secs(1)).await);
    assert_eq!(coordinator.active_tasks(), 1);
}

#[tokio::test]
async fn test_wait_for_shutdown_wakes_on_cancel() {
    let (_, locks) = memory_locks();
    let coordinator = coordinator(locks);
    let waiter = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.wait_for_shutdown().await })
    };
    coordinator.token().cancel();
    waiter.await.unwrap();
    assert!(coordinator.child_token().is_cancelled());
}
