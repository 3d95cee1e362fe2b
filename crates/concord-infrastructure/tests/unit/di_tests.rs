//! Composition root tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use concord_application::use_cases::{CoordinatedJob, TickReport};
use concord_domain::error::{Error, Result};
use concord_domain::value_objects::{FailStrategy, RequestContext};
use concord_infrastructure::config::{AppConfig, IdGeneratorConfig};
use concord_infrastructure::di::{id_generator_from_config, init_context};

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.id_generator.host_ip = Some("10.20.30.40".to_string());
    config
}

#[tokio::test]
async fn test_context_uses_memory_store_by_default() {
    let context = init_context(test_config()).unwrap();
    assert_eq!(context.store().provider_name(), "memory");
    assert!(context.rate_limiter().is_enabled());
}

#[test]
fn test_unknown_provider_fails_fast() {
    let mut config = test_config();
    config.key_store.provider = "etcd".to_string();
    let err = init_context(config).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.to_string().contains("etcd"));
}

#[tokio::test]
async fn test_with_lock_through_context() {
    let context = init_context(test_config()).unwrap();
    let options = context.lock_options();

    let result = context
        .with_lock("job:flush", &options, || async { Ok::<_, Error>(5) })
        .await
        .unwrap();
    assert_eq!(result, Some(5));
    assert!(!context.locks().is_locked("job:flush").await.unwrap());
}

#[tokio::test]
async fn test_configured_fail_strategy_applies() {
    let mut config = test_config();
    config.lock.fail_strategy = FailStrategy::Skip;
    let context = init_context(config).unwrap();
    let _held = context
        .locks()
        .acquire(
            "job:flush",
            Duration::from_secs(60),
            concord_domain::value_objects::WaitPolicy::NoWait,
        )
        .await
        .unwrap();

    let result = context
        .with_lock("job:flush", &context.lock_options(), || async {
            Ok::<_, Error>(())
        })
        .await
        .unwrap();
    assert_eq!(result, None);
}

/// Job that records the page sizes it is asked for
#[derive(Default)]
struct SizeRecordingJob {
    sizes: Mutex<Vec<usize>>,
}

#[async_trait]
impl CoordinatedJob for SizeRecordingJob {
    type Record = u32;

    fn name(&self) -> &str {
        "sizes"
    }

    async fn fetch_page(&self, page: usize, size: usize) -> Result<Vec<u32>> {
        self.sizes.lock().unwrap().push(size);
        let available = 10usize.saturating_sub(page * size).min(size);
        Ok((0..available).map(|v| u32::try_from(v).unwrap()).collect())
    }

    fn partition_key(&self, _record: &u32) -> String {
        "all".to_string()
    }

    async fn process_group(&self, _partition: &str, _records: Vec<u32>) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_configured_page_size_reaches_jobs() {
    let mut config = test_config();
    config.jobs.page_size = 4;
    let context = init_context(config).unwrap();
    assert_eq!(context.job_runner().page_size(), 4);

    let job = SizeRecordingJob::default();
    let report = context.job_runner().run_tick(&job).await.unwrap();
    let TickReport::Completed(stats) = report else {
        panic!("tick should have run");
    };
    assert_eq!(stats.records, 10);
    assert_eq!(*job.sizes.lock().unwrap(), vec![4, 4, 4]);
}

#[tokio::test]
async fn test_default_rate_limit_guard() {
    let mut config = test_config();
    config.rate_limit.default_limit = 1;
    config.rate_limit.scope = "api".to_string();
    let context = init_context(config).unwrap();
    let guard = context.default_rate_limit_guard();
    let ctx = RequestContext::new().with_peer_addr("192.0.2.1");

    let decision = guard.check(&ctx).await.unwrap();
    assert_eq!(decision.key, "rate_limit:api:IP:192.0.2.1");
    assert_eq!(guard.check(&ctx).await.unwrap_err().http_status(), 429);
}

#[test]
fn test_id_generator_from_config_uses_configured_host() {
    let generator = id_generator_from_config(&IdGeneratorConfig {
        location: "eu".to_string(),
        host_ip: Some("10.20.30.40".to_string()),
        port: "9090".to_string(),
    })
    .unwrap();
    let id = generator.next();
    assert_eq!(&id[12..14], "eu");
    assert_eq!(&id[25..29], "1e28");
    assert_eq!(&id[29..31], "90");
}

#[test]
fn test_id_generator_from_config_resolves_local_host() {
    let generator = id_generator_from_config(&IdGeneratorConfig::default()).unwrap();
    assert_eq!(generator.next().len(), 32);
}

#[tokio::test]
async fn test_context_shutdown_runs_hooks_once() {
    let context = init_context(test_config()).unwrap();
    let ran = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    {
        let ran = Arc::clone(&ran);
        context
            .shutdown_coordinator()
            .register_hook("count", move || async move {
                ran.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            });
    }

    assert!(context.shutdown().await);
    assert_eq!(ran.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(!context
        .locks()
        .is_locked(&context.config.shutdown.lock_key)
        .await
        .unwrap());
}
