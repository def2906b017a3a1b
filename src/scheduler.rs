//! Monthly review purge.
//!
//! One background task per process. Each cycle deletes every review outside
//! the current month bucket, then sleeps until 00:00 UTC on the first of the
//! next month. A failed purge is logged and retried after a fixed backoff,
//! indefinitely. Cancellation is observed while sleeping and while backing off;
//! an in-flight purge is allowed to finish.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::db::Store;
use crate::domain::{MonthBucket, next_month_boundary};

/// Longest single sleep while waiting for a month boundary. The remaining
/// time is recomputed from the wall clock after each slice, so clock
/// adjustments or host suspend cannot push a purge far past the boundary.
const MAX_SLEEP_SLICE: Duration = Duration::from_secs(60 * 60);

/// Bulk delete of reviews outside a bucket.
#[async_trait]
pub trait ReviewPurger: Send + Sync {
    async fn purge_outside(&self, current: &MonthBucket) -> Result<u64>;
}

#[async_trait]
impl ReviewPurger for Store {
    async fn purge_outside(&self, current: &MonthBucket) -> Result<u64> {
        self.purge_reviews_outside(current).await
    }
}

/// Wall-clock source for bucket selection and boundary waits.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct PurgeScheduler {
    purger: Arc<dyn ReviewPurger>,
    retry_backoff: Duration,
    clock: Clock,
    task: Mutex<Option<RunningTask>>,
}

impl PurgeScheduler {
    pub fn new(purger: Arc<dyn ReviewPurger>, config: &SchedulerConfig) -> Self {
        Self {
            purger,
            retry_backoff: config.retry_backoff(),
            clock: Arc::new(Utc::now),
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Spawns the purge loop. The first purge runs immediately.
    pub async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;

        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            anyhow::bail!("Purge scheduler is already running");
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.purger),
            self.retry_backoff,
            Arc::clone(&self.clock),
            cancel.clone(),
        ));

        *task = Some(RunningTask { cancel, handle });
        info!(
            retry_backoff_secs = self.retry_backoff.as_secs(),
            "Started monthly purge scheduler"
        );
        Ok(())
    }

    /// Signals cancellation and waits for the loop to exit.
    pub async fn stop(&self) {
        let Some(running) = self.task.lock().await.take() else {
            return;
        };

        info!("Stopping purge scheduler...");
        running.cancel.cancel();

        if let Err(e) = running.handle.await {
            warn!(error = %e, "Purge scheduler task ended abnormally");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Runs a single purge against the current month, outside the loop.
    pub async fn run_once(&self) -> Result<u64> {
        purge_cycle(self.purger.as_ref(), (self.clock)()).await
    }
}

async fn purge_cycle(purger: &dyn ReviewPurger, now: DateTime<Utc>) -> Result<u64> {
    let current = MonthBucket::from_timestamp(now);
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "purge_reviews", bucket = %current, "Purging reviews outside current month");

    let removed = purger.purge_outside(&current).await?;

    info!(
        event = "job_finished",
        job_name = "purge_reviews",
        bucket = %current,
        removed,
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Review purge finished"
    );
    Ok(removed)
}

async fn run_loop(
    purger: Arc<dyn ReviewPurger>,
    retry_backoff: Duration,
    clock: Clock,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let completed = match purge_cycle(purger.as_ref(), clock()).await {
            Ok(_) => {
                let next = next_month_boundary(clock());
                info!(next_run = %next.format("%Y-%m-%d %H:%M:%S UTC"), "Next review purge scheduled");
                sleep_until(next, clock.as_ref(), &cancel).await
            }
            Err(e) => {
                error!(
                    event = "job_failed",
                    job_name = "purge_reviews",
                    error = %e,
                    retry_in_secs = retry_backoff.as_secs(),
                    "Review purge failed"
                );
                sleep_for(retry_backoff, &cancel).await
            }
        };

        if !completed {
            break;
        }
    }

    info!("Monthly purge scheduler stopped");
}

/// Returns false when cancelled before `duration` elapsed.
async fn sleep_for(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Sleeps until `clock` reaches `deadline`. Returns false when cancelled.
async fn sleep_until(
    deadline: DateTime<Utc>,
    clock: &(dyn Fn() -> DateTime<Utc> + Send + Sync),
    cancel: &CancellationToken,
) -> bool {
    loop {
        let remaining = (deadline - clock()).to_std().unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return true;
        }

        debug!(remaining_secs = remaining.as_secs(), "Waiting for month boundary");
        if !sleep_for(remaining.min(MAX_SLEEP_SLICE), cancel).await {
            return false;
        }
    }
}
