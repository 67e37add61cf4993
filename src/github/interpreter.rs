//! GitHub effect interpreter using octocrab.
//!
//! Implements [`GitHubInterpreter`] for [`OctocrabClient`]. Queries go
//! through [`retry_with_backoff`] with [`RetryConfig::DEFAULT`], so transient
//! failures are retried in place. Mutations are attempted once; a failed
//! mutation reaches the caller, and a fired job is retried by the queue
//! runner after re-checking the thread.
//!
//! Pull requests are read through the REST endpoint directly (rather than
//! octocrab's model) so `mergeable_state` arrives as the raw string.

use serde::{Deserialize, Serialize};

use crate::config::MergeMethod;
use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, PullData, ThreadData};
use crate::types::{
    CommentId, MergeStateStatus, PullState, Sha, ThreadKind, ThreadNumber, ThreadState,
};

use super::client::OctocrabClient;
use super::error::{GitHubApiError, is_head_moved_message};
use super::retry::{RetryConfig, retry_with_backoff};

// ─── Interpreter Implementation ───────────────────────────────────────────────

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        interpret_github_effect(self, effect, RetryConfig::DEFAULT).await
    }
}

/// Executes a GitHub effect, retrying transient errors for queries only.
pub async fn interpret_github_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
    retry_config: RetryConfig,
) -> Result<GitHubResponse, GitHubApiError> {
    let retry_config = retry_config_for(&effect, retry_config);
    retry_with_backoff(retry_config, || execute_effect(client, effect.clone()))
        .await
        .into_result()
}

fn retry_config_for(effect: &GitHubEffect, retry_config: RetryConfig) -> RetryConfig {
    if effect.is_query() {
        retry_config
    } else {
        RetryConfig::NONE
    }
}

async fn execute_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::GetThread { number } => get_thread(client, number).await,
        GitHubEffect::GetPull { number } => get_pull(client, number).await,
        GitHubEffect::GetConfigFile { path } => get_config_file(client, path).await,
        GitHubEffect::PostComment { number, body } => post_comment(client, number, body).await,
        GitHubEffect::CloseThread { number } => close_thread(client, number).await,
        GitHubEffect::MergePull {
            number,
            method,
            expected_sha,
        } => merge_pull(client, number, method, expected_sha).await,
        GitHubEffect::DeleteBranch { branch } => delete_branch(client, branch).await,
        GitHubEffect::CreateTag { tag, sha } => create_tag(client, tag, sha).await,
    }
}

// ─── Threads ──────────────────────────────────────────────────────────────────

async fn get_thread(
    client: &OctocrabClient,
    number: ThreadNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let issue = client
        .inner()
        .issues(client.owner(), client.repo_name())
        .get(number.0)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    let state = match issue.state {
        octocrab::models::IssueState::Closed => ThreadState::Closed,
        _ => ThreadState::Open,
    };
    let kind = if issue.pull_request.is_some() {
        ThreadKind::PullRequest
    } else {
        ThreadKind::Issue
    };

    Ok(GitHubResponse::Thread(ThreadData {
        number,
        kind,
        state,
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
        author: issue.user.login,
    }))
}

async fn close_thread(
    client: &OctocrabClient,
    number: ThreadNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    client
        .inner()
        .issues(client.owner(), client.repo_name())
        .update(number.0)
        .state(octocrab::models::IssueState::Closed)
        .send()
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::Closed)
}

async fn post_comment(
    client: &OctocrabClient,
    number: ThreadNumber,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let comment = client
        .inner()
        .issues(client.owner(), client.repo_name())
        .create_comment(number.0, body)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::CommentPosted {
        id: CommentId(comment.id.into_inner()),
    })
}

// ─── Pull Requests ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawPull {
    state: String,
    #[serde(default)]
    merged: bool,
    merge_commit_sha: Option<String>,
    mergeable: Option<bool>,
    mergeable_state: Option<String>,
    #[serde(default)]
    draft: bool,
    head: RawRef,
    base: RawRef,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
    repo: Option<RawRepo>,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    full_name: String,
}

async fn get_pull(
    client: &OctocrabClient,
    number: ThreadNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/pulls/{}",
        client.owner(),
        client.repo_name(),
        number.0
    );

    let raw: RawPull = client
        .inner()
        .get(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::Pull(pull_data_from_raw(number, raw)))
}

fn pull_data_from_raw(number: ThreadNumber, raw: RawPull) -> PullData {
    let state = if raw.merged {
        PullState::Merged {
            merge_commit_sha: raw.merge_commit_sha.map(Sha::new),
        }
    } else if raw.state.eq_ignore_ascii_case("closed") {
        PullState::Closed
    } else {
        PullState::Open
    };

    let same_repo = match (&raw.head.repo, &raw.base.repo) {
        (Some(head), Some(base)) => head.full_name.eq_ignore_ascii_case(&base.full_name),
        _ => false,
    };

    PullData {
        number,
        state,
        mergeable: raw.mergeable,
        merge_state: resolve_merge_state(raw.mergeable_state.as_deref(), raw.draft),
        head_ref: raw.head.ref_name,
        head_sha: Sha::new(raw.head.sha),
        same_repo,
    }
}

/// Resolves the merge state, treating drafts as unmergeable regardless of
/// what `mergeable_state` says.
pub fn resolve_merge_state(mergeable_state: Option<&str>, is_draft: bool) -> MergeStateStatus {
    if is_draft {
        return MergeStateStatus::Draft;
    }
    match mergeable_state {
        Some(state) => MergeStateStatus::from_api(&state.to_lowercase()),
        None => MergeStateStatus::Unknown,
    }
}

#[derive(Serialize)]
struct MergeRequest<'a> {
    merge_method: &'static str,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct MergeResponse {
    sha: String,
    merged: bool,
    message: Option<String>,
}

fn merge_method_str(method: MergeMethod) -> &'static str {
    match method {
        MergeMethod::Merge => "merge",
        MergeMethod::Squash => "squash",
        MergeMethod::Rebase => "rebase",
    }
}

async fn merge_pull(
    client: &OctocrabClient,
    number: ThreadNumber,
    method: MergeMethod,
    expected_sha: Sha,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/pulls/{}/merge",
        client.owner(),
        client.repo_name(),
        number.0
    );

    let request = MergeRequest {
        merge_method: merge_method_str(method),
        sha: expected_sha.as_str(),
    };

    let result: Result<MergeResponse, _> = client.inner().put(&url, Some(&request)).await;

    match result {
        Ok(response) if response.merged => Ok(GitHubResponse::Merged {
            sha: Sha::new(response.sha),
        }),
        Ok(response) => Err(GitHubApiError::permanent_without_source(format!(
            "merge of {} returned merged=false: {}",
            number,
            response.message.as_deref().unwrap_or("unknown reason")
        ))),
        Err(e) => {
            let err = GitHubApiError::from_octocrab(e);
            if err.status_code == Some(409) && is_head_moved_message(&err.message) {
                match err.source {
                    Some(source) => Err(GitHubApiError::sha_mismatch(number, &expected_sha, source)),
                    None => Err(err),
                }
            } else {
                Err(err)
            }
        }
    }
}

async fn delete_branch(
    client: &OctocrabClient,
    branch: String,
) -> Result<GitHubResponse, GitHubApiError> {
    client
        .inner()
        .repos(client.owner(), client.repo_name())
        .delete_ref(&octocrab::params::repos::Reference::Branch(branch))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::BranchDeleted)
}

async fn create_tag(
    client: &OctocrabClient,
    tag: String,
    sha: Sha,
) -> Result<GitHubResponse, GitHubApiError> {
    client
        .inner()
        .repos(client.owner(), client.repo_name())
        .create_ref(&octocrab::params::repos::Reference::Tag(tag), sha.0)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::TagCreated)
}

// ─── Repository Contents ──────────────────────────────────────────────────────

async fn get_config_file(
    client: &OctocrabClient,
    path: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .repos(client.owner(), client.repo_name())
        .get_content()
        .path(&path)
        .send()
        .await;

    match result {
        Ok(mut contents) => {
            let document = contents
                .take_items()
                .into_iter()
                .next()
                .and_then(|item| item.decoded_content());
            Ok(GitHubResponse::ConfigFile(document))
        }
        Err(e) => {
            let err = GitHubApiError::from_octocrab(e);
            if err.is_not_found() {
                Ok(GitHubResponse::ConfigFile(None))
            } else {
                Err(err)
            }
        }
    }
}
