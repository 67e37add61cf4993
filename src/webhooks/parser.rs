//! Webhook payload parser.
//!
//! The `X-GitHub-Event` header selects the payload shape. Events and actions
//! the bot has no route for parse to `Ok(None)`; payloads that claim a handled
//! event but are missing required fields are errors.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{
    CommentId, InstallationId, RepoId, Thread, ThreadKind, ThreadNumber, ThreadState,
};

use super::events::{
    CommentAction, CommentEvent, ReviewAction, ReviewEvent, ReviewState, ThreadAction,
    ThreadEvent, WebhookEvent,
};

#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed JSON or a missing required field.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a delivery into a typed event.
///
/// Returns `Ok(None)` for deliveries the bot ignores.
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    match event_type {
        "issues" => parse_issues(payload),
        "pull_request" => parse_pull_request(payload),
        "pull_request_review" => parse_review(payload),
        "issue_comment" => parse_issue_comment(payload),
        _ => Ok(None),
    }
}

// ============================================================================
// Raw payload structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawUser,
    name: String,
}

impl RawRepository {
    fn id(self) -> RepoId {
        RepoId::new(self.owner.login, self.name)
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

/// The parts of an issue or pull request object the bot reads.
#[derive(Debug, Deserialize)]
struct RawThread {
    number: u64,
    state: String,
    #[serde(default)]
    labels: Vec<RawLabel>,
    user: RawUser,
    /// Present on issues that are pull requests.
    pull_request: Option<serde_json::Value>,
}

/// Fields shared by every delivery the bot parses.
#[derive(Debug, Deserialize)]
struct RawEnvelope<T> {
    action: String,
    repository: RawRepository,
    installation: Option<RawInstallation>,
    #[serde(flatten)]
    body: T,
}

impl<T> RawEnvelope<T> {
    /// Repository webhooks (as opposed to App webhooks) carry no installation.
    fn installation(&self) -> InstallationId {
        InstallationId(self.installation.as_ref().map_or(0, |i| i.id))
    }
}

fn build_thread(
    raw: RawThread,
    kind: ThreadKind,
    repo: RepoId,
    installation: InstallationId,
) -> Thread {
    Thread {
        repo,
        number: ThreadNumber(raw.number),
        kind,
        state: ThreadState::from_api(&raw.state),
        labels: raw.labels.into_iter().map(|l| l.name).collect(),
        author: raw.user.login,
        installation,
    }
}

// ============================================================================
// issues / pull_request
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssueBody {
    issue: RawThread,
    label: Option<RawLabel>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestBody {
    pull_request: RawThread,
    label: Option<RawLabel>,
}

fn thread_action(action: &str, allow_synchronize: bool) -> Option<ThreadAction> {
    match action {
        "labeled" => Some(ThreadAction::Labeled),
        "unlabeled" => Some(ThreadAction::Unlabeled),
        "closed" => Some(ThreadAction::Closed),
        "synchronize" if allow_synchronize => Some(ThreadAction::Synchronize),
        _ => None,
    }
}

fn parse_issues(payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    let raw: RawEnvelope<RawIssueBody> = serde_json::from_slice(payload)?;
    let Some(action) = thread_action(&raw.action, false) else {
        return Ok(None);
    };

    let installation = raw.installation();
    let kind = if raw.body.issue.pull_request.is_some() {
        ThreadKind::PullRequest
    } else {
        ThreadKind::Issue
    };
    let thread = build_thread(raw.body.issue, kind, raw.repository.id(), installation);

    Ok(Some(WebhookEvent::Issues(ThreadEvent {
        action,
        thread,
        label: raw.body.label.map(|l| l.name),
    })))
}

fn parse_pull_request(payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    let raw: RawEnvelope<RawPullRequestBody> = serde_json::from_slice(payload)?;
    let Some(action) = thread_action(&raw.action, true) else {
        return Ok(None);
    };

    let installation = raw.installation();
    let thread = build_thread(
        raw.body.pull_request,
        ThreadKind::PullRequest,
        raw.repository.id(),
        installation,
    );

    Ok(Some(WebhookEvent::PullRequest(ThreadEvent {
        action,
        thread,
        label: raw.body.label.map(|l| l.name),
    })))
}

// ============================================================================
// pull_request_review
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawReviewBody {
    review: RawReview,
    pull_request: RawThread,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    state: String,
}

fn parse_review(payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    let raw: RawEnvelope<RawReviewBody> = serde_json::from_slice(payload)?;
    if raw.action != "submitted" {
        return Ok(None);
    }

    // Webhooks send lowercase review states; the GraphQL API uses uppercase.
    let state = match raw.body.review.state.to_lowercase().as_str() {
        "approved" => ReviewState::Approved,
        "changes_requested" => ReviewState::ChangesRequested,
        "commented" => ReviewState::Commented,
        "dismissed" => ReviewState::Dismissed,
        "pending" => ReviewState::Pending,
        _ => {
            return Err(ParseError::InvalidField {
                field: "review.state",
                value: raw.body.review.state,
            });
        }
    };

    let installation = raw.installation();
    let thread = build_thread(
        raw.body.pull_request,
        ThreadKind::PullRequest,
        raw.repository.id(),
        installation,
    );

    Ok(Some(WebhookEvent::PullRequestReview(ReviewEvent {
        action: ReviewAction::Submitted,
        state,
        thread,
    })))
}

// ============================================================================
// issue_comment
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCommentBody {
    issue: RawIssueNumber,
    comment: RawComment,
}

#[derive(Debug, Deserialize)]
struct RawIssueNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    user: RawUser,
}

fn parse_issue_comment(payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    let raw: RawEnvelope<RawCommentBody> = serde_json::from_slice(payload)?;
    if raw.action != "deleted" {
        return Ok(None);
    }

    let installation = raw.installation();
    Ok(Some(WebhookEvent::IssueComment(CommentEvent {
        repo: raw.repository.id(),
        installation,
        action: CommentAction::Deleted,
        number: ThreadNumber(raw.body.issue.number),
        comment_id: CommentId(raw.body.comment.id),
        author_login: raw.body.comment.user.login,
    })))
}
