//! Tests for the in-memory key store

use std::sync::Arc;
use std::time::Duration;

use concord_domain::ports::KeyStore;
use concord_domain::value_objects::LockMode;
use concord_providers::constants::MEMORY_SWEEP_EVERY;
use concord_providers::key_store::MemoryKeyStore;

// ============================================================================
// Conditional writes
// ============================================================================

#[tokio::test]
async fn test_set_if_absent_only_first_wins() {
    let store = MemoryKeyStore::new();
    let ttl = Duration::from_secs(5);

    assert!(store.set_if_absent("lock:a", "t1", ttl).await.unwrap());
    assert!(!store.set_if_absent("lock:a", "t2", ttl).await.unwrap());
    assert_eq!(store.get("lock:a").await.unwrap().as_deref(), Some("t1"));
}

#[tokio::test]
async fn test_compare_and_delete_requires_matching_value() {
    let store = MemoryKeyStore::new();
    store
        .set_if_absent("lock:a", "owner", Duration::from_secs(5))
        .await
        .unwrap();

    assert!(!store.compare_and_delete("lock:a", "intruder").await.unwrap());
    assert!(store.exists("lock:a").await.unwrap());
    assert!(store.compare_and_delete("lock:a", "owner").await.unwrap());
    assert!(!store.exists("lock:a").await.unwrap());
    assert!(!store.compare_and_delete("lock:a", "owner").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_compare_and_extend_leaves_foreign_ttl_untouched() {
    let store = MemoryKeyStore::new();
    store
        .set_if_absent("lock:a", "owner", Duration::from_millis(1000))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_millis(400)).await;

    assert!(
        !store
            .compare_and_extend("lock:a", "other", Duration::from_secs(60))
            .await
            .unwrap()
    );
    let ttl = store.remaining_ttl("lock:a").await.unwrap().unwrap();
    assert_eq!(ttl, Duration::from_millis(600));

    assert!(
        store
            .compare_and_extend("lock:a", "owner", Duration::from_millis(1000))
            .await
            .unwrap()
    );
    let ttl = store.remaining_ttl("lock:a").await.unwrap().unwrap();
    assert_eq!(ttl, Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_and_expiry() {
    let store = MemoryKeyStore::new();
    store
        .set_if_absent("k", "v", Duration::from_millis(100))
        .await
        .unwrap();
    assert!(store.refresh("k", Duration::from_millis(300)).await.unwrap());

    tokio::time::advance(Duration::from_millis(200)).await;
    assert!(store.exists("k").await.unwrap());

    tokio::time::advance(Duration::from_millis(150)).await;
    assert!(!store.exists("k").await.unwrap());
    assert!(!store.refresh("k", Duration::from_millis(300)).await.unwrap());
    assert_eq!(store.remaining_ttl("k").await.unwrap(), None);
}

// ============================================================================
// Counters
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_increment_sets_ttl_only_on_first_hit() {
    let store = MemoryKeyStore::new();
    let window = Duration::from_secs(1);

    assert_eq!(store.increment_with_expiry("c", window).await.unwrap(), 1);
    tokio::time::advance(Duration::from_millis(600)).await;
    assert_eq!(store.increment_with_expiry("c", window).await.unwrap(), 2);

    // The second hit must not have pushed the window out
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(store.increment_with_expiry("c", window).await.unwrap(), 1);
}

#[tokio::test]
async fn test_increment_rejects_non_integer_value() {
    let store = MemoryKeyStore::new();
    store
        .set_if_absent("c", "not-a-number", Duration::from_secs(5))
        .await
        .unwrap();
    let err = store
        .increment_with_expiry("c", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, concord_domain::Error::StoreUnavailable { .. }));
}

#[tokio::test]
async fn test_unbounded_ttl_never_expires() {
    let store = MemoryKeyStore::new();

    assert!(store.set_if_absent("k", "v", Duration::MAX).await.unwrap());
    assert!(store.exists("k").await.unwrap());
    assert_eq!(store.remaining_ttl("k").await.unwrap(), None);
    assert_eq!(store.increment_with_expiry("c", Duration::MAX).await.unwrap(), 1);
}

// ============================================================================
// Expiry sweep
// ============================================================================

/// Keys that are never touched again are still dropped from memory
#[tokio::test(start_paused = true)]
async fn test_abandoned_windows_are_evicted() {
    let store = MemoryKeyStore::new();
    let window = Duration::from_secs(1);

    for i in 0..10_000 {
        store
            .increment_with_expiry(&format!("rate:{i}"), window)
            .await
            .unwrap();
    }
    assert_eq!(store.stored_entries(), 10_000);

    tokio::time::advance(Duration::from_secs(3600)).await;
    for _ in 0..MEMORY_SWEEP_EVERY {
        store.exists("unrelated").await.unwrap();
    }

    assert_eq!(store.stored_entries(), 0);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_keeps_live_entries() {
    let store = MemoryKeyStore::new().with_sweep_every(2);
    store
        .set_if_absent("short", "v", Duration::from_millis(100))
        .await
        .unwrap();
    store
        .set_if_absent("long", "v", Duration::from_secs(60))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(1)).await;
    store.exists("other").await.unwrap();
    store.exists("other").await.unwrap();

    assert_eq!(store.stored_entries(), 1);
    assert!(store.exists("long").await.unwrap());
}

// ============================================================================
// Read-write members
// ============================================================================

#[tokio::test]
async fn test_readers_share_and_exclude_writer() {
    let store = MemoryKeyStore::new();
    let lease = Duration::from_secs(5);

    assert!(store.acquire_mode("rw", LockMode::Read, "r1", lease).await.unwrap());
    assert!(store.acquire_mode("rw", LockMode::Read, "r2", lease).await.unwrap());
    assert!(!store.acquire_mode("rw", LockMode::Write, "w", lease).await.unwrap());

    assert!(store.release_member("rw", "r1").await.unwrap());
    assert!(store.exists("rw").await.unwrap());
    assert!(!store.acquire_mode("rw", LockMode::Write, "w", lease).await.unwrap());

    assert!(store.release_member("rw", "r2").await.unwrap());
    assert!(!store.exists("rw").await.unwrap());
    assert!(store.acquire_mode("rw", LockMode::Write, "w", lease).await.unwrap());
}

#[tokio::test]
async fn test_writer_excludes_everyone() {
    let store = MemoryKeyStore::new();
    let lease = Duration::from_secs(5);

    assert!(store.acquire_mode("rw", LockMode::Write, "w1", lease).await.unwrap());
    assert!(!store.acquire_mode("rw", LockMode::Read, "r", lease).await.unwrap());
    assert!(!store.acquire_mode("rw", LockMode::Write, "w2", lease).await.unwrap());
    assert!(!store.release_member("rw", "r").await.unwrap());
    assert!(store.release_member("rw", "w1").await.unwrap());
    assert!(!store.release_member("rw", "w1").await.unwrap());
}

#[tokio::test]
async fn test_plain_and_member_keys_do_not_mix() {
    let store = MemoryKeyStore::new();
    let lease = Duration::from_secs(5);

    store.set_if_absent("plain", "t", lease).await.unwrap();
    assert!(!store.acquire_mode("plain", LockMode::Read, "r", lease).await.unwrap());
    assert!(!store.release_member("plain", "t").await.unwrap());
    assert!(!store.extend_member("plain", "t", lease).await.unwrap());

    store.acquire_mode("rw", LockMode::Read, "r", lease).await.unwrap();
    assert!(!store.set_if_absent("rw", "t", lease).await.unwrap());
    assert!(!store.compare_and_delete("rw", "r").await.unwrap());
    assert!(store.get("rw").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_extend_member_never_shortens_shared_lease() {
    let store = MemoryKeyStore::new();
    store
        .acquire_mode("rw", LockMode::Read, "a", Duration::from_millis(1000))
        .await
        .unwrap();
    store
        .acquire_mode("rw", LockMode::Read, "b", Duration::from_millis(200))
        .await
        .unwrap();
    assert!(
        store
            .extend_member("rw", "b", Duration::from_millis(200))
            .await
            .unwrap()
    );
    assert_eq!(
        store.remaining_ttl("rw").await.unwrap(),
        Some(Duration::from_millis(1000))
    );

    assert!(
        !store
            .extend_member("rw", "stranger", Duration::from_secs(10))
            .await
            .unwrap()
    );

    tokio::time::advance(Duration::from_millis(1001)).await;
    assert!(!store.exists("rw").await.unwrap());
    assert!(store.acquire_mode("rw", LockMode::Write, "w", Duration::from_secs(1)).await.unwrap());
}

// ============================================================================
// Concurrency
// ============================================================================

/// Only one of many concurrent contenders creates the key
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_set_if_absent_single_winner() {
    let store = Arc::new(MemoryKeyStore::new());
    let mut handles = Vec::new();
    for i in 0..64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .set_if_absent("lock:race", &format!("t{i}"), Duration::from_secs(5))
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let store = Arc::new(MemoryKeyStore::new());
    let mut handles = Vec::new();
    for _ in 0..200 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .increment_with_expiry("counter", Duration::from_secs(60))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(store.get("counter").await.unwrap().as_deref(), Some("200"));
}

#[test]
fn test_provider_name() {
    assert_eq!(MemoryKeyStore::new().provider_name(), "memory");
}
