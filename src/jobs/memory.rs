//! In-process delayed queue.
//!
//! Jobs live in a single map behind a `tokio::sync::Mutex`, so every
//! operation is atomic. Nothing survives a restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::key::JobKey;
use super::queue::{DelayedQueue, JobPayload, QueueError, ScheduledJob};

#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<HashMap<JobKey, ScheduledJob>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelayedQueue for MemoryQueue {
    async fn get_job(&self, key: &JobKey) -> Result<Option<ScheduledJob>, QueueError> {
        Ok(self.jobs.lock().await.get(key).cloned())
    }

    async fn create_or_replace(
        &self,
        key: JobKey,
        payload: JobPayload,
        fire_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().await;
        let notified = jobs.get(&key).is_some_and(|j| j.notified);
        jobs.insert(
            key.clone(),
            ScheduledJob {
                key,
                payload,
                fire_at,
                notified,
                attempts: 0,
            },
        );
        Ok(())
    }

    async fn mark_notified(&self, key: &JobKey) -> Result<bool, QueueError> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(key) {
            Some(job) if !job.notified => {
                job.notified = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_job(&self, key: &JobKey) -> Result<bool, QueueError> {
        Ok(self.jobs.lock().await.remove(key).is_some())
    }

    async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, QueueError> {
        let mut jobs = self.jobs.lock().await;
        let due_keys: Vec<JobKey> = jobs
            .values()
            .filter(|j| j.fire_at <= now)
            .map(|j| j.key.clone())
            .collect();

        let mut due: Vec<ScheduledJob> = due_keys
            .iter()
            .filter_map(|key| jobs.remove(key))
            .collect();
        due.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.key.cmp(&b.key)));
        Ok(due)
    }

    async fn retry(&self, job: ScheduledJob, fire_at: DateTime<Utc>) -> Result<bool, QueueError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.key) {
            return Ok(false);
        }
        jobs.insert(
            job.key.clone(),
            ScheduledJob {
                fire_at,
                attempts: job.attempts + 1,
                ..job
            },
        );
        Ok(true)
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.jobs.lock().await.len())
    }
}
