//! Scheduled coordinated jobs
//!
//! A scheduled job runs on every instance, but each tick does work on at
//! most one of them: the tick takes the job's lock without waiting, keeps it
//! alive with a heartbeat, pages through the job's records, and processes
//! each page partition by partition. A failing partition is logged and
//! counted; the remaining partitions still run.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use concord_domain::error::{Error, Result};
use concord_domain::ports::LockGuard;
use concord_domain::value_objects::{LockOptions, WaitPolicy};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::lease_renewer::LeaseRenewer;
use super::lock_manager::LockManager;
use super::shutdown::ShutdownCoordinator;

/// Page size used when neither the job nor the runner sets one
pub const DEFAULT_JOB_PAGE_SIZE: usize = 100;

/// A batch job coordinated across instances
#[async_trait]
pub trait CoordinatedJob: Send + Sync + 'static {
    /// Record type produced by [`CoordinatedJob::fetch_page`]
    type Record: Send + 'static;

    /// Job name used in logs and the default lock key
    fn name(&self) -> &str;

    /// Lock key guarding a tick
    fn lock_key(&self) -> String {
        format!("lock:job:{}", self.name())
    }

    /// Records per page; `None` uses the runner's page size
    fn page_size(&self) -> Option<usize> {
        None
    }

    /// Fetch page `page` (zero based) of at most `size` records
    async fn fetch_page(&self, page: usize, size: usize) -> Result<Vec<Self::Record>>;

    /// Partition a record belongs to
    fn partition_key(&self, record: &Self::Record) -> String;

    /// Process all records of one partition from one page
    async fn process_group(&self, partition: &str, records: Vec<Self::Record>) -> Result<()>;
}

/// Counters for one completed tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Pages fetched
    pub pages: usize,
    /// Records fetched
    pub records: usize,
    /// Partition groups processed successfully
    pub groups: usize,
    /// Partition groups that failed
    pub failed_groups: usize,
    /// Wall time of the tick
    pub elapsed_ms: u64,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// Another instance held the job lock
    Skipped,
    /// This instance ran the tick
    Completed(JobStats),
}

/// Runs coordinated job ticks
#[derive(Clone, Debug)]
pub struct ScheduledJobRunner {
    locks: Arc<LockManager>,
    renewer: LeaseRenewer,
    lease: Duration,
    heartbeat_fraction: f64,
    page_size: usize,
}

impl ScheduledJobRunner {
    /// Runner taking job locks for `lease`
    pub fn new(locks: Arc<LockManager>, renewer: LeaseRenewer, lease: Duration) -> Self {
        Self {
            locks,
            renewer,
            lease,
            heartbeat_fraction: LockOptions::DEFAULT_HEARTBEAT_FRACTION,
            page_size: DEFAULT_JOB_PAGE_SIZE,
        }
    }

    /// Page size for jobs that do not choose their own
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Page size applied to jobs without their own
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Renew every `fraction` of the lease
    pub fn with_heartbeat_fraction(mut self, fraction: f64) -> Self {
        self.heartbeat_fraction = fraction;
        self
    }

    /// Run one tick of `job`
    pub async fn run_tick<J: CoordinatedJob>(&self, job: &J) -> Result<TickReport> {
        let key = job.lock_key();
        let guard = match self.locks.acquire(&key, self.lease, WaitPolicy::NoWait).await {
            Ok(guard) => guard,
            Err(Error::LockNotAcquired { .. }) => {
                debug!(job = job.name(), key = %key, "job lock held elsewhere, skipping tick");
                return Ok(TickReport::Skipped);
            }
            Err(e) => return Err(e),
        };

        let interval = LockOptions::new(self.lease)
            .with_heartbeat_fraction(self.heartbeat_fraction)
            .heartbeat_interval();
        let mut heartbeat = match interval.map(|i| self.renewer.start(&guard, i)).transpose() {
            Ok(handle) => handle,
            Err(e) => {
                self.release(&guard).await;
                return Err(e);
            }
        };

        let outcome = AssertUnwindSafe(process_pages(job, self.page_size)).catch_unwind().await;

        if let Some(handle) = heartbeat.as_mut() {
            handle.stop().await;
        }
        self.release(&guard).await;

        match outcome {
            Ok(Ok(stats)) => {
                info!(
                    job = job.name(),
                    pages = stats.pages,
                    records = stats.records,
                    failed_groups = stats.failed_groups,
                    elapsed_ms = stats.elapsed_ms,
                    "job tick completed"
                );
                Ok(TickReport::Completed(stats))
            }
            Ok(Err(e)) => Err(e),
            Err(panic) => Err(Error::job(job.name(), panic_message(panic.as_ref()))),
        }
    }

    /// Run `job` every `every` until the coordinator shuts down.
    ///
    /// Missed ticks are skipped rather than bursted.
    pub fn spawn<J: CoordinatedJob>(
        &self,
        job: Arc<J>,
        every: Duration,
        coordinator: &ShutdownCoordinator,
    ) -> JoinHandle<()> {
        let runner = self.clone();
        coordinator.spawn_cancellable("scheduled-job", move |token| async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if let Err(e) = runner.run_tick(job.as_ref()).await {
                    warn!(job = job.name(), error = %e, "job tick failed");
                }
            }
            debug!(job = job.name(), "job schedule stopped");
        })
    }

    async fn release(&self, guard: &LockGuard) {
        if let Err(e) = self.locks.release(guard).await {
            warn!(key = %guard.key, error = %e, "job lock release failed; lease will expire");
        }
    }
}

async fn process_pages<J: CoordinatedJob>(job: &J, default_size: usize) -> Result<JobStats> {
    let size = job.page_size().unwrap_or(default_size);
    if size == 0 {
        return Err(Error::job(job.name(), "page size must be positive"));
    }

    let started = Instant::now();
    let mut stats = JobStats::default();
    let mut page = 0;
    loop {
        let records = job.fetch_page(page, size).await?;
        let fetched = records.len();
        stats.pages += 1;
        stats.records += fetched;

        for (partition, group) in group_by_partition(job, records) {
            match job.process_group(&partition, group).await {
                Ok(()) => stats.groups += 1,
                Err(e) => {
                    stats.failed_groups += 1;
                    warn!(job = job.name(), partition = %partition, error = %e, "partition failed");
                }
            }
        }

        if fetched < size {
            break;
        }
        page += 1;
    }

    stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(stats)
}

/// Group records by partition, keeping first-seen partition order
fn group_by_partition<J: CoordinatedJob>(
    job: &J,
    records: Vec<J::Record>,
) -> Vec<(String, Vec<J::Record>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<J::Record>)> = Vec::new();
    for record in records {
        let partition = job.partition_key(&record);
        match index.get(&partition) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(partition.clone(), groups.len());
                groups.push((partition, vec![record]));
            }
        }
    }
    groups
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
