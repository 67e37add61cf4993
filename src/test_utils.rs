//! Shared test doubles and fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::analytics::{Analytics, AnalyticsError, AnalyticsEvent};
use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, PullData, ThreadData};
use crate::github::{ClientFactory, GitHubApiError};
use crate::jobs::{DelayedQueue, JobKey, JobPayload, MemoryQueue, QueueError, ScheduledJob};
use crate::types::{
    CommentId, InstallationId, MergeStateStatus, PullState, RepoId, Sha, Thread, ThreadKind,
    ThreadNumber, ThreadState,
};

// ─── Fixtures ───

pub const OWNER: &str = "mfix22";
pub const REPO: &str = "test-issue-bot";
pub const INSTALLATION: u64 = 135737;
pub const AUTHOR: &str = "octocat";

/// Repository configuration used by the end-to-end scenarios.
pub const FIXTURE_CONFIG: &str = r#"
labels:
  - duplicate
  - wontfix
  - invalid
  - stale
delayTime: 1ms

comment: This issue has been marked to be closed in $DELAY.

labelConfig:
  duplicate:
    delayTime: 5ms
    comment: $LABEL issue created! Closing in $DELAY . . .
  stale: false
  invalid: true
  wontfix:
    delayTime: 10ms
    comment: false

actions:
  merge:
    labels: [automerge]
    delayTime: 1h
    method: squash
    deleteBranch: true
    tag: pr-$NUMBER
  comment:
    labels: [needs-info]
    delayTime: 2 days
    comment: "@$AUTHOR, could you add the details requested in `$LABEL`?"
"#;

pub fn fixture_repo() -> RepoId {
    RepoId::new(OWNER, REPO)
}

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn issue(number: u64, label_names: &[&str], state: ThreadState) -> Thread {
    Thread {
        repo: fixture_repo(),
        number: ThreadNumber(number),
        kind: ThreadKind::Issue,
        state,
        labels: labels(label_names),
        author: AUTHOR.to_string(),
        installation: InstallationId(INSTALLATION),
    }
}

pub fn pull_request(number: u64, label_names: &[&str], state: ThreadState) -> Thread {
    Thread {
        kind: ThreadKind::PullRequest,
        ..issue(number, label_names, state)
    }
}

pub fn thread_data(thread: &Thread) -> ThreadData {
    ThreadData {
        number: thread.number,
        kind: thread.kind,
        state: thread.state,
        labels: thread.labels.clone(),
        author: thread.author.clone(),
    }
}

pub fn mergeable_pull(number: u64) -> PullData {
    PullData {
        number: ThreadNumber(number),
        state: PullState::Open,
        mergeable: Some(true),
        merge_state: MergeStateStatus::Clean,
        head_ref: "feature".to_string(),
        head_sha: Sha::new("a".repeat(40)),
        same_repo: true,
    }
}

pub fn payload(number: u64, action: crate::types::ActionKind) -> JobPayload {
    JobPayload {
        owner: OWNER.to_string(),
        repo: REPO.to_string(),
        number,
        installation_id: INSTALLATION,
        action,
    }
}

// ─── Recording GitHub interpreter ───

#[derive(Debug, Default)]
struct GitHubState {
    effects: Vec<GitHubEffect>,
    threads: HashMap<u64, ThreadData>,
    pulls: HashMap<u64, PullData>,
    config: Option<String>,
    fail_comments: bool,
    fail_merge: Option<fn() -> GitHubApiError>,
    fail_config: bool,
    next_comment_id: u64,
}

/// A GitHub interpreter that records every effect and answers from canned data.
#[derive(Debug, Default)]
pub struct RecordingGitHub {
    state: Mutex<GitHubState>,
}

impl RecordingGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(self, document: &str) -> Self {
        self.state.lock().unwrap().config = Some(document.to_string());
        self
    }

    pub fn with_thread(self, thread: &Thread) -> Self {
        self.set_thread(thread);
        self
    }

    pub fn set_thread(&self, thread: &Thread) {
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(thread.number.0, thread_data(thread));
    }

    pub fn with_pull(self, pull: PullData) -> Self {
        self.set_pull(pull);
        self
    }

    pub fn set_pull(&self, pull: PullData) {
        self.state.lock().unwrap().pulls.insert(pull.number.0, pull);
    }

    pub fn failing_comments(self) -> Self {
        self.state.lock().unwrap().fail_comments = true;
        self
    }

    pub fn failing_merge(self, error: fn() -> GitHubApiError) -> Self {
        self.state.lock().unwrap().fail_merge = Some(error);
        self
    }

    pub fn failing_config(self) -> Self {
        self.state.lock().unwrap().fail_config = true;
        self
    }

    pub fn effects(&self) -> Vec<GitHubEffect> {
        self.state.lock().unwrap().effects.clone()
    }

    /// Bodies of every `PostComment` effect, in order.
    pub fn comments(&self) -> Vec<(ThreadNumber, String)> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                GitHubEffect::PostComment { number, body } => Some((number, body)),
                _ => None,
            })
            .collect()
    }

    /// Effects other than reads.
    pub fn mutations(&self) -> Vec<GitHubEffect> {
        self.effects()
            .into_iter()
            .filter(|e| {
                !matches!(
                    e,
                    GitHubEffect::GetThread { .. }
                        | GitHubEffect::GetPull { .. }
                        | GitHubEffect::GetConfigFile { .. }
                )
            })
            .collect()
    }

    pub fn config_fetches(&self) -> usize {
        self.effects()
            .iter()
            .filter(|e| matches!(e, GitHubEffect::GetConfigFile { .. }))
            .count()
    }
}

impl GitHubInterpreter for RecordingGitHub {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.effects.push(effect.clone());

        match effect {
            GitHubEffect::GetThread { number } => state
                .threads
                .get(&number.0)
                .cloned()
                .map(GitHubResponse::Thread)
                .ok_or_else(|| GitHubApiError::permanent_without_source("Not Found")),
            GitHubEffect::GetPull { number } => state
                .pulls
                .get(&number.0)
                .cloned()
                .map(GitHubResponse::Pull)
                .ok_or_else(|| GitHubApiError::permanent_without_source("Not Found")),
            GitHubEffect::GetConfigFile { .. } => {
                if state.fail_config {
                    Err(GitHubApiError::transient_without_source("502 Bad Gateway"))
                } else {
                    Ok(GitHubResponse::ConfigFile(state.config.clone()))
                }
            }
            GitHubEffect::PostComment { .. } => {
                if state.fail_comments {
                    return Err(GitHubApiError::transient_without_source("connection reset"));
                }
                state.next_comment_id += 1;
                Ok(GitHubResponse::CommentPosted {
                    id: CommentId(state.next_comment_id),
                })
            }
            GitHubEffect::CloseThread { number } => {
                if let Some(thread) = state.threads.get_mut(&number.0) {
                    thread.state = ThreadState::Closed;
                }
                Ok(GitHubResponse::Closed)
            }
            GitHubEffect::MergePull { number, .. } => {
                if let Some(make_error) = state.fail_merge {
                    return Err(make_error());
                }
                if let Some(pull) = state.pulls.get_mut(&number.0) {
                    pull.state = PullState::Merged {
                        merge_commit_sha: Some(Sha::new("m".repeat(40))),
                    };
                }
                Ok(GitHubResponse::Merged {
                    sha: Sha::new("m".repeat(40)),
                })
            }
            GitHubEffect::DeleteBranch { .. } => Ok(GitHubResponse::BranchDeleted),
            GitHubEffect::CreateTag { .. } => Ok(GitHubResponse::TagCreated),
        }
    }
}

/// Hands out one shared [`RecordingGitHub`] for every repository.
#[derive(Debug, Clone)]
pub struct RecordingFactory {
    pub github: Arc<RecordingGitHub>,
}

impl RecordingFactory {
    pub fn new(github: RecordingGitHub) -> Self {
        RecordingFactory {
            github: Arc::new(github),
        }
    }
}

impl ClientFactory for RecordingFactory {
    type Client = Arc<RecordingGitHub>;

    fn client_for(
        &self,
        _repo: &RepoId,
        _installation: InstallationId,
    ) -> Result<Self::Client, GitHubApiError> {
        Ok(self.github.clone())
    }
}

// ─── Recording queue ───

/// A [`MemoryQueue`] that records create and remove calls.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    inner: MemoryQueue,
    creates: Mutex<Vec<(JobKey, JobPayload, DateTime<Utc>)>>,
    removes: Mutex<Vec<JobKey>>,
    unavailable: bool,
    retry_failing: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose every operation fails.
    pub fn unavailable() -> Self {
        RecordingQueue {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn creates(&self) -> Vec<(JobKey, JobPayload, DateTime<Utc>)> {
        self.creates.lock().unwrap().clone()
    }

    pub fn removes(&self) -> Vec<JobKey> {
        self.removes.lock().unwrap().clone()
    }

    /// Makes `retry` fail until switched back.
    pub fn set_retry_failing(&self, failing: bool) {
        self.retry_failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), QueueError> {
        if self.unavailable {
            Err(QueueError::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

impl DelayedQueue for RecordingQueue {
    async fn get_job(&self, key: &JobKey) -> Result<Option<ScheduledJob>, QueueError> {
        self.check()?;
        self.inner.get_job(key).await
    }

    async fn create_or_replace(
        &self,
        key: JobKey,
        payload: JobPayload,
        fire_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        self.check()?;
        self.creates
            .lock()
            .unwrap()
            .push((key.clone(), payload.clone(), fire_at));
        self.inner.create_or_replace(key, payload, fire_at).await
    }

    async fn mark_notified(&self, key: &JobKey) -> Result<bool, QueueError> {
        self.check()?;
        self.inner.mark_notified(key).await
    }

    async fn remove_job(&self, key: &JobKey) -> Result<bool, QueueError> {
        self.check()?;
        self.removes.lock().unwrap().push(key.clone());
        self.inner.remove_job(key).await
    }

    async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, QueueError> {
        self.check()?;
        self.inner.take_due(now).await
    }

    async fn retry(&self, job: ScheduledJob, fire_at: DateTime<Utc>) -> Result<bool, QueueError> {
        self.check()?;
        if self.retry_failing.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("blip".into()));
        }
        self.inner.retry(job, fire_at).await
    }

    async fn len(&self) -> Result<usize, QueueError> {
        self.check()?;
        self.inner.len().await
    }
}

// ─── Recording analytics ───

#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
    failing: bool,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records events and then reports failure.
    pub fn failing() -> Self {
        RecordingAnalytics {
            failing: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Analytics for RecordingAnalytics {
    async fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.events.lock().unwrap().push(event);
        if self.failing {
            Err(AnalyticsError::Unavailable("sink down".into()))
        } else {
            Ok(())
        }
    }
}

// ─── Webhook payloads ───

fn label_values(names: &[&str]) -> Vec<Value> {
    names.iter().map(|n| json!({ "name": n })).collect()
}

fn repository() -> Value {
    json!({
        "name": REPO,
        "full_name": format!("{OWNER}/{REPO}"),
        "owner": { "login": OWNER }
    })
}

fn state_str(state: ThreadState) -> &'static str {
    match state {
        ThreadState::Open => "open",
        ThreadState::Closed => "closed",
    }
}

pub fn issues_payload(action: &str, number: u64, label_names: &[&str], state: ThreadState) -> Value {
    json!({
        "action": action,
        "issue": {
            "number": number,
            "state": state_str(state),
            "labels": label_values(label_names),
            "user": { "login": AUTHOR }
        },
        "repository": repository(),
        "installation": { "id": INSTALLATION }
    })
}

pub fn pull_request_payload(
    action: &str,
    number: u64,
    label_names: &[&str],
    state: ThreadState,
) -> Value {
    json!({
        "action": action,
        "number": number,
        "pull_request": {
            "number": number,
            "state": state_str(state),
            "labels": label_values(label_names),
            "user": { "login": AUTHOR }
        },
        "repository": repository(),
        "installation": { "id": INSTALLATION }
    })
}

pub fn review_payload(number: u64, label_names: &[&str]) -> Value {
    json!({
        "action": "submitted",
        "review": { "state": "approved" },
        "pull_request": {
            "number": number,
            "state": "open",
            "labels": label_values(label_names),
            "user": { "login": AUTHOR }
        },
        "repository": repository(),
        "installation": { "id": INSTALLATION }
    })
}

pub fn comment_payload(action: &str, number: u64, comment_author: &str) -> Value {
    json!({
        "action": action,
        "issue": {
            "number": number,
            "state": "open",
            "labels": [],
            "user": { "login": AUTHOR }
        },
        "comment": {
            "id": 99,
            "body": "duplicate issue created! Closing in 5 ms . . .",
            "user": { "login": comment_author }
        },
        "repository": repository(),
        "installation": { "id": INSTALLATION }
    })
}

pub fn installation_payload() -> Value {
    json!({
        "action": "created",
        "installation": { "id": INSTALLATION, "account": { "login": OWNER } }
    })
}
