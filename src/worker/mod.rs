//! Job execution.
//!
//! A fired job carries only the thread's identity and the action. Everything
//! else is re-read when the job runs: the thread, its labels, the repository
//! configuration and, for merges, the pull request. A job whose trigger has
//! gone away in the meantime is skipped rather than executed.
//!
//! # Outcomes
//!
//! - `Ok(JobOutcome::Skipped(..))`: nothing to do; the job is finished.
//! - `Err(WorkerError::RetryJob { .. })`: the pull request is not mergeable
//!   yet. The runner reschedules the job and does not report it as a failure.
//! - Any other error: the runner reschedules and reports it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, DEFAULT_CONFIG_PATH, LabelPolicy, fetch_repo_config};
use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, PullData, ThreadData};
use crate::github::{ClientFactory, GitHubApiError, GitHubErrorKind};
use crate::jobs::JobPayload;
use crate::labels::{EffectiveLabel, effective_label, matching_labels};
use crate::scheduler::{render, render_tag};
use crate::types::{ActionKind, Sha, ThreadNumber};

#[cfg(test)]
mod tests;

/// Errors from executing a job.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    GitHub(#[from] GitHubApiError),

    /// No client could be built for the job's repository.
    #[error("failed to create GitHub client: {0}")]
    Client(#[source] GitHubApiError),

    /// The action cannot run yet; try again later.
    #[error("not ready: {reason}")]
    RetryJob { reason: String },

    #[error("unexpected response to {effect}: {response}")]
    UnexpectedResponse {
        effect: &'static str,
        response: String,
    },
}

impl WorkerError {
    /// Returns true for the "not ready yet" sentinel, which is rescheduled
    /// without being reported as a failure.
    pub fn is_expected_retry(&self) -> bool {
        matches!(self, WorkerError::RetryJob { .. })
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;

/// Why a fired job did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A close job found the thread already closed.
    AlreadyClosed,

    /// No label triggering this action is left on the thread.
    NoActionableLabel,

    /// The thread or pull request is no longer open.
    NotOpen,

    /// The comment template resolved to disabled.
    CommentDisabled,
}

/// What a fired job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Closed,
    Merged { sha: Sha },
    Commented,
    Skipped(SkipReason),
}

/// Executes fired jobs against GitHub.
pub struct JobWorker<F> {
    factory: Arc<F>,
    config_path: String,
}

impl<F> Clone for JobWorker<F> {
    fn clone(&self) -> Self {
        JobWorker {
            factory: self.factory.clone(),
            config_path: self.config_path.clone(),
        }
    }
}

impl<F: ClientFactory> JobWorker<F> {
    pub fn new(factory: Arc<F>) -> Self {
        JobWorker {
            factory,
            config_path: DEFAULT_CONFIG_PATH.to_string(),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Re-validates and executes one job.
    #[instrument(skip_all, fields(key = %payload.key(), action = %payload.action))]
    pub async fn process(&self, payload: &JobPayload) -> Result<JobOutcome> {
        let github = self
            .factory
            .client_for(&payload.repo_id(), payload.installation())
            .map_err(WorkerError::Client)?;
        let number = payload.thread_number();

        let outcome = match payload.action {
            ActionKind::Close => self.close(&github, number).await?,
            ActionKind::Merge => self.merge(&github, number).await?,
            ActionKind::Comment => self.comment(&github, number).await?,
        };

        match &outcome {
            JobOutcome::Skipped(reason) => debug!(?reason, "Skipped job"),
            _ => info!(?outcome, "Job completed"),
        }
        Ok(outcome)
    }

    async fn close<G>(&self, github: &G, number: ThreadNumber) -> Result<JobOutcome>
    where
        G: GitHubInterpreter<Error = GitHubApiError>,
    {
        let thread = fetch_thread(github, number).await?;
        if thread.state.is_closed() {
            return Ok(JobOutcome::Skipped(SkipReason::AlreadyClosed));
        }

        let config = fetch_repo_config(github, &self.config_path).await?;
        if scheduled_label(&config.close, &thread.labels).is_none() {
            return Ok(JobOutcome::Skipped(SkipReason::NoActionableLabel));
        }

        match github.interpret(GitHubEffect::CloseThread { number }).await? {
            GitHubResponse::Closed => Ok(JobOutcome::Closed),
            other => Err(unexpected("CloseThread", other)),
        }
    }

    async fn merge<G>(&self, github: &G, number: ThreadNumber) -> Result<JobOutcome>
    where
        G: GitHubInterpreter<Error = GitHubApiError>,
    {
        let thread = fetch_thread(github, number).await?;
        if thread.state.is_closed() {
            return Ok(JobOutcome::Skipped(SkipReason::NotOpen));
        }

        let config = fetch_repo_config(github, &self.config_path).await?;
        let merge = &config.merge;
        if scheduled_label(&merge.policy, &thread.labels).is_none() {
            return Ok(JobOutcome::Skipped(SkipReason::NoActionableLabel));
        }

        let pull = fetch_pull(github, number).await?;
        if !pull.state.is_open() {
            return Ok(JobOutcome::Skipped(SkipReason::NotOpen));
        }
        if !pull.is_ready_to_merge() {
            return Err(WorkerError::RetryJob {
                reason: format!(
                    "pull request {} is not mergeable (mergeable: {:?}, state: {:?})",
                    number, pull.mergeable, pull.merge_state
                ),
            });
        }

        let effect = GitHubEffect::MergePull {
            number,
            method: merge.method,
            expected_sha: pull.head_sha.clone(),
        };
        let sha = match github.interpret(effect).await {
            Ok(GitHubResponse::Merged { sha }) => sha,
            Ok(other) => return Err(unexpected("MergePull", other)),
            Err(e) if e.kind == GitHubErrorKind::ShaMismatch => {
                return Err(WorkerError::RetryJob {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        info!(number = %number, sha = %sha.short(), "Merged pull request");

        if merge.delete_branch {
            delete_head_branch(github, &pull).await;
        }
        if let Some(template) = &merge.tag {
            let tag = render_tag(template, number.0, &pull.head_ref);
            let effect = GitHubEffect::CreateTag {
                tag: tag.clone(),
                sha: sha.clone(),
            };
            match github.interpret(effect).await {
                Ok(_) => info!(tag, "Created tag"),
                Err(e) => warn!(tag, error = %e, "Failed to create tag"),
            }
        }

        Ok(JobOutcome::Merged { sha })
    }

    async fn comment<G>(&self, github: &G, number: ThreadNumber) -> Result<JobOutcome>
    where
        G: GitHubInterpreter<Error = GitHubApiError>,
    {
        let thread = fetch_thread(github, number).await?;
        if thread.state.is_closed() {
            return Ok(JobOutcome::Skipped(SkipReason::NotOpen));
        }

        let config = fetch_repo_config(github, &self.config_path).await?;
        let Some(effective) = scheduled_label(&config.comment, &thread.labels) else {
            return Ok(JobOutcome::Skipped(SkipReason::NoActionableLabel));
        };
        let Some(template) = effective.comment.text() else {
            return Ok(JobOutcome::Skipped(SkipReason::CommentDisabled));
        };

        let body = render(template, &effective.delay, &effective.label, &thread.author);
        match github
            .interpret(GitHubEffect::PostComment { number, body })
            .await?
        {
            GitHubResponse::CommentPosted { .. } => Ok(JobOutcome::Commented),
            other => Err(unexpected("PostComment", other)),
        }
    }
}

/// The effective label, if it still schedules the action.
fn scheduled_label(policy: &LabelPolicy, labels: &[String]) -> Option<EffectiveLabel> {
    effective_label(policy, &matching_labels(policy, labels))
        .filter(|effective| effective.delay.duration().is_some())
}

async fn fetch_thread<G>(github: &G, number: ThreadNumber) -> Result<ThreadData>
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    match github.interpret(GitHubEffect::GetThread { number }).await? {
        GitHubResponse::Thread(thread) => Ok(thread),
        other => Err(unexpected("GetThread", other)),
    }
}

async fn fetch_pull<G>(github: &G, number: ThreadNumber) -> Result<PullData>
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    match github.interpret(GitHubEffect::GetPull { number }).await? {
        GitHubResponse::Pull(pull) => Ok(pull),
        other => Err(unexpected("GetPull", other)),
    }
}

/// Deletes a merged pull request's head branch. Branches on forks are left alone.
async fn delete_head_branch<G>(github: &G, pull: &PullData)
where
    G: GitHubInterpreter<Error = GitHubApiError>,
{
    if !pull.same_repo {
        debug!(branch = %pull.head_ref, "Head branch is on a fork, not deleting");
        return;
    }
    let effect = GitHubEffect::DeleteBranch {
        branch: pull.head_ref.clone(),
    };
    match github.interpret(effect).await {
        Ok(_) => info!(branch = %pull.head_ref, "Deleted head branch"),
        Err(e) => warn!(branch = %pull.head_ref, error = %e, "Failed to delete head branch"),
    }
}

fn unexpected(effect: &'static str, response: GitHubResponse) -> WorkerError {
    WorkerError::UnexpectedResponse {
        effect,
        response: format!("{response:?}"),
    }
}
