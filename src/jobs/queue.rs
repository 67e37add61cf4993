//! The delayed-queue contract.
//!
//! A queue holds at most one [`ScheduledJob`] per [`JobKey`]. Every operation
//! is atomic with respect to a single key; callers hold no locks of their own.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ActionKind, InstallationId, RepoId, Thread, ThreadNumber};

use super::key::JobKey;

/// Errors from queue operations. Propagated to the caller without local retry.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend unavailable: {0}")]
    Unavailable(String),
}

/// What a job does when it fires.
///
/// Serialized as `{owner, repo, number, installationId, action}` so jobs stay
/// readable by any backend that stores them as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    #[serde(rename = "installationId")]
    pub installation_id: u64,
    pub action: ActionKind,
}

impl JobPayload {
    pub fn for_thread(thread: &Thread, action: ActionKind) -> Self {
        JobPayload {
            owner: thread.repo.owner.clone(),
            repo: thread.repo.repo.clone(),
            number: thread.number.0,
            installation_id: thread.installation.0,
            action,
        }
    }

    pub fn repo_id(&self) -> RepoId {
        RepoId::new(&self.owner, &self.repo)
    }

    pub fn thread_number(&self) -> ThreadNumber {
        ThreadNumber(self.number)
    }

    pub fn installation(&self) -> InstallationId {
        InstallationId(self.installation_id)
    }

    pub fn key(&self) -> JobKey {
        JobKey::for_thread(&self.repo_id(), self.thread_number(), self.action)
    }
}

/// A pending job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub key: JobKey,
    pub payload: JobPayload,
    pub fire_at: DateTime<Utc>,

    /// Whether the scheduling notice has been posted for this job.
    pub notified: bool,

    /// Failed executions so far.
    pub attempts: u32,
}

/// Delayed job storage with per-key create, cancel and claim.
pub trait DelayedQueue: Send + Sync {
    /// Returns the pending job for a key, if any.
    fn get_job(
        &self,
        key: &JobKey,
    ) -> impl Future<Output = Result<Option<ScheduledJob>, QueueError>> + Send;

    /// Creates the job, or replaces the pending one under the same key.
    ///
    /// Replacing keeps the existing `notified` flag and resets `attempts`.
    fn create_or_replace(
        &self,
        key: JobKey,
        payload: JobPayload,
        fire_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Sets the job's `notified` flag.
    ///
    /// Returns true only for the call that flipped it; false if it was
    /// already set or no job exists.
    fn mark_notified(&self, key: &JobKey) -> impl Future<Output = Result<bool, QueueError>> + Send;

    /// Removes the pending job. Returns whether one existed.
    fn remove_job(&self, key: &JobKey) -> impl Future<Output = Result<bool, QueueError>> + Send;

    /// Removes and returns every job due at `now`, earliest first.
    fn take_due(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ScheduledJob>, QueueError>> + Send;

    /// Puts a claimed job back for another attempt.
    ///
    /// Does nothing and returns false if a job was created under the same key
    /// after this one was claimed.
    fn retry(
        &self,
        job: ScheduledJob,
        fire_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, QueueError>> + Send;

    /// Number of pending jobs.
    fn len(&self) -> impl Future<Output = Result<usize, QueueError>> + Send;
}
