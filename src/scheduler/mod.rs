//! Label-triggered scheduling.
//!
//! [`ActionScheduler::on_label_change`] runs on every relevant webhook event
//! for one (thread, action) pair. Its state lives entirely in the queue:
//!
//! - **Idle**: no job under the key.
//! - **Pending**: a job exists with some `fire_at`.
//!
//! # Notification
//!
//! Close and merge jobs post a notice when first scheduled. The job's
//! `notified` flag is flipped with [`DelayedQueue::mark_notified`] after the
//! job is written, and only the call that flips it posts. Replacing a job keeps
//! the flag, so a pending window gets at most one notice even when deliveries
//! race.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::analytics::{Analytics, AnalyticsEvent};
use crate::config::{Delay, RepoConfig};
use crate::effects::{GitHubEffect, GitHubInterpreter};
use crate::jobs::{DelayedQueue, JobKey, JobPayload, QueueError};
use crate::labels::{effective_label, matching_labels};
use crate::types::{ActionKind, RepoId, Thread, ThreadNumber};

pub mod template;

pub use template::{render, render_tag};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// What a label change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The thread is closed; nothing was touched.
    ThreadClosed,

    /// No actionable label; any pending job was removed.
    Cancelled { removed: bool },

    /// A job was created or replaced.
    Scheduled {
        key: JobKey,
        label: String,
        fire_at: DateTime<Utc>,
        notified: bool,
    },

    /// The effective label suppresses scheduling; any pending job was removed.
    Suppressed {
        label: String,
        notified: bool,
        removed: bool,
    },
}

/// Creates, replaces and cancels delayed jobs in response to label changes.
pub struct ActionScheduler<Q, A> {
    queue: Arc<Q>,
    analytics: Arc<A>,
}

impl<Q, A> Clone for ActionScheduler<Q, A> {
    fn clone(&self) -> Self {
        ActionScheduler {
            queue: self.queue.clone(),
            analytics: self.analytics.clone(),
        }
    }
}

impl<Q, A> ActionScheduler<Q, A>
where
    Q: DelayedQueue,
    A: Analytics,
{
    pub fn new(queue: Arc<Q>, analytics: Arc<A>) -> Self {
        ActionScheduler { queue, analytics }
    }

    pub fn queue(&self) -> &Arc<Q> {
        &self.queue
    }

    /// Brings the pending job for `(thread, kind)` in line with the thread's
    /// current labels.
    #[instrument(skip_all, fields(repo = %thread.repo, number = %thread.number, action = %kind))]
    pub async fn on_label_change<G>(
        &self,
        github: &G,
        config: &RepoConfig,
        thread: &Thread,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome>
    where
        G: GitHubInterpreter,
    {
        if thread.state.is_closed() {
            debug!("Thread is closed, ignoring label change");
            return Ok(ScheduleOutcome::ThreadClosed);
        }

        let key = JobKey::for_thread(&thread.repo, thread.number, kind);
        let policy = config.policy(kind);
        let matching = matching_labels(policy, &thread.labels);

        let Some(effective) = effective_label(policy, &matching) else {
            let removed = self.queue.remove_job(&key).await?;
            if removed {
                info!(key = %key, "No actionable label left, cancelled pending job");
            }
            return Ok(ScheduleOutcome::Cancelled { removed });
        };

        let notice = if kind.notifies_on_schedule() {
            effective.comment.text().map(|template| {
                render(template, &effective.delay, &effective.label, &thread.author)
            })
        } else {
            None
        };

        match effective.delay {
            Delay::After(delay) => {
                let fire_at = fire_time(now, delay);
                let payload = JobPayload::for_thread(thread, kind);
                self.queue
                    .create_or_replace(key.clone(), payload, fire_at)
                    .await?;
                info!(key = %key, label = %effective.label, fire_at = %fire_at, "Scheduled job");

                let mut notified = false;
                if let Some(body) = notice
                    && self.queue.mark_notified(&key).await?
                {
                    post_notice(github, thread.number, body).await;
                    notified = true;
                }

                self.track(AnalyticsEvent::Scheduled {
                    repo: thread.repo.clone(),
                    number: thread.number,
                    key: key.clone(),
                    action: kind,
                    label: effective.label.clone(),
                    fire_at,
                })
                .await;

                Ok(ScheduleOutcome::Scheduled {
                    key,
                    label: effective.label,
                    fire_at,
                    notified,
                })
            }
            // Only a pending job stops the notice, so it is posted again on
            // every matching event while the label stays suppressed.
            Delay::Suppressed => {
                let mut notified = false;
                if let Some(body) = notice
                    && self.queue.get_job(&key).await?.is_none()
                {
                    post_notice(github, thread.number, body).await;
                    notified = true;
                }

                let removed = self.queue.remove_job(&key).await?;
                debug!(key = %key, label = %effective.label, removed, "Label suppresses scheduling");

                Ok(ScheduleOutcome::Suppressed {
                    label: effective.label,
                    notified,
                    removed,
                })
            }
        }
    }

    /// Removes the pending job of every action kind for a thread.
    ///
    /// Returns how many jobs existed.
    #[instrument(skip_all, fields(repo = %repo, number = %number))]
    pub async fn cancel_all(&self, repo: &RepoId, number: ThreadNumber) -> Result<usize> {
        let mut removed = 0;
        for kind in ActionKind::ALL {
            let key = JobKey::for_thread(repo, number, kind);
            if self.queue.remove_job(&key).await? {
                info!(key = %key, "Cancelled pending job");
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn track(&self, event: AnalyticsEvent) {
        if let Err(e) = self.analytics.track(event).await {
            warn!(error = %e, "Failed to record analytics event");
        }
    }
}

/// Posts a notice, logging instead of failing.
async fn post_notice<G: GitHubInterpreter>(github: &G, number: ThreadNumber, body: String) {
    match github
        .interpret(GitHubEffect::PostComment { number, body })
        .await
    {
        Ok(_) => debug!(number = %number, "Posted scheduling notice"),
        Err(e) => warn!(number = %number, error = %e, "Failed to post scheduling notice"),
    }
}

/// When a job scheduled at `now` with `delay` fires. Saturates instead of
/// overflowing for absurd delays.
pub fn fire_time(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
