//! Fires due jobs.
//!
//! The runner wakes every poll interval, claims every due job with
//! [`DelayedQueue::take_due`] and runs it through the [`JobWorker`]. Claiming
//! removes the job, so a cancellation arriving mid-run does not affect it.
//!
//! Failed jobs are put back with exponential backoff until
//! [`RetryConfig::JOBS`] is exhausted, then dropped. A job that cannot be put
//! back because the queue is failing is held by the runner and offered to the
//! queue again on the next pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::analytics::{Analytics, AnalyticsEvent};
use crate::github::{ClientFactory, RetryConfig};
use crate::scheduler::fire_time;
use crate::worker::{JobWorker, WorkerError};

use super::queue::{DelayedQueue, QueueError, ScheduledJob};

/// Counts from one pass over the due jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs that ran to an outcome, including skips.
    pub completed: usize,

    /// Failed jobs put back for another attempt.
    pub retried: usize,

    /// Failed jobs that were given up on, or superseded by a newer job.
    pub dropped: usize,
}

pub struct QueueRunner<Q, F, A> {
    queue: Arc<Q>,
    worker: JobWorker<F>,
    analytics: Arc<A>,
    poll_interval: Duration,
    retry: RetryConfig,

    /// Claimed jobs whose reschedule failed, with their intended fire time.
    stranded: Mutex<Vec<(ScheduledJob, DateTime<Utc>)>>,
}

impl<Q, F, A> QueueRunner<Q, F, A>
where
    Q: DelayedQueue,
    F: ClientFactory,
    A: Analytics,
{
    pub fn new(
        queue: Arc<Q>,
        worker: JobWorker<F>,
        analytics: Arc<A>,
        poll_interval: Duration,
    ) -> Self {
        QueueRunner {
            queue,
            worker,
            analytics,
            poll_interval,
            retry: RetryConfig::JOBS,
            stranded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(poll_interval = ?self.poll_interval, "Queue runner started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping queue runner");
                    break;
                }

                _ = ticker.tick() => {
                    match self.run_once(Utc::now()).await {
                        Ok(summary) if summary != RunSummary::default() => {
                            debug!(?summary, "Processed due jobs");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Failed to poll delayed queue"),
                    }
                }
            }
        }
    }

    /// Claims and runs every job due at `now`.
    ///
    /// A queue error while rescheduling one job does not stop the pass: the
    /// remaining claimed jobs still run, and the first error is returned at
    /// the end.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunSummary, QueueError> {
        let mut summary = RunSummary::default();
        self.requeue_stranded().await;

        let mut failure = None;
        for job in self.queue.take_due(now).await? {
            match self.worker.process(&job.payload).await {
                Ok(_) => summary.completed += 1,
                Err(e) => match self.handle_failure(job, e, now).await {
                    Ok(true) => summary.retried += 1,
                    Ok(false) => summary.dropped += 1,
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                },
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Offers held jobs to the queue again. Jobs the queue still rejects stay
    /// held.
    async fn requeue_stranded(&self) {
        let mut stranded = self.stranded.lock().await;
        if stranded.is_empty() {
            return;
        }

        let mut held = Vec::new();
        for (job, fire_at) in stranded.drain(..) {
            match self.queue.retry(job.clone(), fire_at).await {
                Ok(_) => debug!(key = %job.key, fire_at = %fire_at, "Requeued held job"),
                Err(e) => {
                    warn!(key = %job.key, error = %e, "Queue still failing, holding job");
                    held.push((job, fire_at));
                }
            }
        }
        *stranded = held;
    }

    /// Reschedules a failed job. Returns whether it was put back.
    async fn handle_failure(
        &self,
        job: ScheduledJob,
        err: WorkerError,
        now: DateTime<Utc>,
    ) -> Result<bool, QueueError> {
        if err.is_expected_retry() {
            debug!(key = %job.key, attempts = job.attempts, reason = %err, "Job not ready yet");
        } else {
            error!(key = %job.key, attempts = job.attempts, error = %err, "Job failed");
            let event = AnalyticsEvent::ActionFailed {
                key: job.key.clone(),
                action: job.payload.action,
                attempts: job.attempts + 1,
                error: err.to_string(),
            };
            if let Err(e) = self.analytics.track(event).await {
                warn!(error = %e, "Failed to record analytics event");
            }
        }

        if !self.retry.allows_retry(job.attempts) {
            error!(key = %job.key, attempts = job.attempts + 1, "Giving up on job");
            return Ok(false);
        }

        let fire_at = fire_time(now, self.retry.delay_for_attempt(job.attempts));
        match self.queue.retry(job.clone(), fire_at).await {
            Ok(true) => {
                debug!(key = %job.key, fire_at = %fire_at, "Rescheduled job");
                Ok(true)
            }
            Ok(false) => {
                debug!(key = %job.key, "Job was replaced while running, not rescheduling");
                Ok(false)
            }
            Err(e) => {
                error!(key = %job.key, error = %e, "Failed to reschedule job, holding it");
                self.stranded.lock().await.push((job, fire_at));
                Err(e)
            }
        }
    }
}
