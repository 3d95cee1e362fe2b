//! Tests for lock-protected sections

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use concord_application::use_cases::{LeaseRenewer, LockManager, LockService};
use concord_domain::error::Error;
use concord_domain::value_objects::{FailStrategy, LockMode, LockOptions, WaitPolicy};

use crate::support::{FailingStore, memory_locks, renewer_for};

fn service() -> LockService {
    let (_, locks) = memory_locks();
    let renewer = renewer_for(&locks);
    LockService::new(locks, renewer)
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_with_lock_runs_section_and_releases() {
    let service = service();
    let options = LockOptions::new(Duration::from_secs(5)).without_heartbeat();

    let value = service
        .with_lock("lock:a", &options, || async {
            Ok::<_, Error>(42)
        })
        .await
        .unwrap();
    assert_eq!(value, Some(42));
    assert!(!service.locks().is_locked("lock:a").await.unwrap());
}

#[tokio::test]
async fn test_section_error_still_releases() {
    let service = service();
    let options = LockOptions::new(Duration::from_secs(5));

    let err = service
        .with_lock("lock:a", &options, || async {
            Err::<(), _>(Error::internal("section failed"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal { .. }));
    assert!(!service.locks().is_locked("lock:a").await.unwrap());
    assert_eq!(service.renewer().active_heartbeats(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_covers_long_section() {
    let service = service();
    let options = LockOptions::new(Duration::from_millis(400));
    let locks = Arc::clone(service.locks());

    let held_throughout = service
        .with_lock("lock:long", &options, || async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            locks.is_locked("lock:long").await
        })
        .await
        .unwrap();
    assert_eq!(held_throughout, Some(true));
    assert!(!service.locks().is_locked("lock:long").await.unwrap());
}

// ============================================================================
// Fail strategies
// ============================================================================

async fn held_elsewhere(service: &LockService, key: &str) {
    service
        .locks()
        .acquire(key, Duration::from_secs(60), WaitPolicy::NoWait)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reject_strategy_returns_error() {
    let service = service();
    held_elsewhere(&service, "lock:a").await;
    let flag = AtomicBool::new(false);
    let ran = &flag;

    let err = service
        .with_lock(
            "lock:a",
            &LockOptions::new(Duration::from_secs(5)).with_fail_strategy(FailStrategy::Reject),
            move || async move {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LockNotAcquired { .. }));
    assert_eq!(err.http_status(), 409);
    assert!(!flag.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_skip_strategy_returns_none() {
    let service = service();
    held_elsewhere(&service, "lock:a").await;
    let flag = AtomicBool::new(false);
    let ran = &flag;

    let result = service
        .with_lock(
            "lock:a",
            &LockOptions::new(Duration::from_secs(5)).with_fail_strategy(FailStrategy::Skip),
            move || async move {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await
        .unwrap();
    assert_eq!(result, None);
    assert!(!flag.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_proceed_unguarded_runs_section() {
    let service = service();
    held_elsewhere(&service, "lock:a").await;

    let result = service
        .with_lock(
            "lock:a",
            &LockOptions::new(Duration::from_secs(5))
                .with_fail_strategy(FailStrategy::ProceedUnguarded),
            || async { Ok::<_, Error>("ran") },
        )
        .await
        .unwrap();
    assert_eq!(result, Some("ran"));
    // The other holder keeps its lock
    assert!(service.locks().is_locked("lock:a").await.unwrap());
}

#[tokio::test]
async fn test_store_outage_goes_through_fail_strategy() {
    let locks = Arc::new(LockManager::new(Arc::new(FailingStore)));
    let service = LockService::new(Arc::clone(&locks), LeaseRenewer::new(locks));

    let skipped = service
        .with_lock(
            "lock:a",
            &LockOptions::new(Duration::from_secs(5)).with_fail_strategy(FailStrategy::Skip),
            || async { Ok::<_, Error>(1) },
        )
        .await
        .unwrap();
    assert_eq!(skipped, None);

    let err = service
        .with_lock("lock:a", &LockOptions::new(Duration::from_secs(5)), || async {
            Ok::<_, Error>(1)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { .. }));
}

/// Two workers race for `job:flush` with the skip strategy: exactly one runs
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_skip_runs_exactly_once() {
    use std::sync::atomic::AtomicUsize;

    let service = service();
    let runs = Arc::new(AtomicUsize::new(0));
    let skips = Arc::new(AtomicUsize::new(0));
    let options = LockOptions::new(Duration::from_secs(10)).with_fail_strategy(FailStrategy::Skip);

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        let runs = Arc::clone(&runs);
        let skips = Arc::clone(&skips);
        let options = options.clone();
        handles.push(tokio::spawn(async move {
            let outcome = service
                .with_lock("job:flush", &options, move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, Error>(())
                })
                .await
                .unwrap();
            if outcome.is_none() {
                skips.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(skips.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Panics
// ============================================================================

#[tokio::test]
async fn test_panic_in_section_releases_lock() {
    let service = service();
    let task = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .with_lock("lock:boom", &LockOptions::new(Duration::from_secs(30)), || async {
                    if section_panics() {
                        panic!("section exploded");
                    }
                    Ok::<_, Error>(())
                })
                .await
        })
    };

    let join = task.await;
    assert!(join.unwrap_err().is_panic());
    assert!(!service.locks().is_locked("lock:boom").await.unwrap());
    assert_eq!(service.renewer().active_heartbeats(), 0);
}

fn section_panics() -> bool {
    true
}


// ============================================================================
// Read-write sections
// ============================================================================

#[tokio::test]
async fn test_read_sections_share_the_key() {
    let service = service();
    let locks = Arc::clone(service.locks());
    let held = locks
        .acquire_read("rw:a", Duration::from_secs(10), WaitPolicy::NoWait)
        .await
        .unwrap();

    let read = LockOptions::new(Duration::from_secs(5)).with_mode(LockMode::Read);
    let value = service
        .with_lock("rw:a", &read, || async { Ok::<_, Error>("shared") })
        .await
        .unwrap();
    assert_eq!(value, Some("shared"));

    let write = LockOptions::new(Duration::from_secs(5))
        .with_mode(LockMode::Write)
        .with_fail_strategy(FailStrategy::Reject);
    let err = service
        .with_lock("rw:a", &write, || async { Ok::<_, Error>(()) })
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 409);

    assert!(locks.release(&held).await.unwrap());
    assert!(!locks.is_locked("rw:a").await.unwrap());
}
