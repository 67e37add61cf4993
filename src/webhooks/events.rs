//! Typed webhook events.
//!
//! Only the deliveries the bot reacts to have a variant here. Everything else
//! (installation events, new comments, other actions) parses to `None` and is
//! acknowledged without processing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CommentId, InstallationId, RepoId, Thread, ThreadNumber};

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    /// `issues` event.
    Issues(ThreadEvent),

    /// `pull_request` event.
    PullRequest(ThreadEvent),

    /// `pull_request_review` event.
    PullRequestReview(ReviewEvent),

    /// `issue_comment` event.
    IssueComment(CommentEvent),
}

impl WebhookEvent {
    pub fn repo(&self) -> &RepoId {
        match self {
            WebhookEvent::Issues(e) | WebhookEvent::PullRequest(e) => &e.thread.repo,
            WebhookEvent::PullRequestReview(e) => &e.thread.repo,
            WebhookEvent::IssueComment(e) => &e.repo,
        }
    }

    pub fn installation(&self) -> InstallationId {
        match self {
            WebhookEvent::Issues(e) | WebhookEvent::PullRequest(e) => e.thread.installation,
            WebhookEvent::PullRequestReview(e) => e.thread.installation,
            WebhookEvent::IssueComment(e) => e.installation,
        }
    }

    /// The thread snapshot carried by the delivery, if any.
    pub fn thread(&self) -> Option<&Thread> {
        match self {
            WebhookEvent::Issues(e) | WebhookEvent::PullRequest(e) => Some(&e.thread),
            WebhookEvent::PullRequestReview(e) => Some(&e.thread),
            WebhookEvent::IssueComment(_) => None,
        }
    }

    /// `event.action`, as used in the route table.
    pub fn name(&self) -> EventName {
        match self {
            WebhookEvent::Issues(e) => EventName::new("issues", e.action.as_str()),
            WebhookEvent::PullRequest(e) => EventName::new("pull_request", e.action.as_str()),
            WebhookEvent::PullRequestReview(e) => {
                EventName::new("pull_request_review", e.action.as_str())
            }
            WebhookEvent::IssueComment(e) => EventName::new("issue_comment", e.action.as_str()),
        }
    }
}

/// An `event.action` pair such as `issues.labeled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventName {
    pub event: &'static str,
    pub action: &'static str,
}

impl EventName {
    pub const fn new(event: &'static str, action: &'static str) -> Self {
        EventName { event, action }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.event, self.action)
    }
}

/// Actions on an issue or pull request that the bot reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadAction {
    Labeled,
    Unlabeled,
    Closed,
    /// New commits were pushed to a pull request.
    Synchronize,
}

impl ThreadAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadAction::Labeled => "labeled",
            ThreadAction::Unlabeled => "unlabeled",
            ThreadAction::Closed => "closed",
            ThreadAction::Synchronize => "synchronize",
        }
    }
}

/// An `issues` or `pull_request` delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEvent {
    pub action: ThreadAction,

    /// The thread as it is after the change.
    pub thread: Thread,

    /// The label added or removed, for label actions.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submitted,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Submitted => "submitted",
        }
    }
}

/// The state of a submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

/// A `pull_request_review` delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub action: ReviewAction,
    pub state: ReviewState,

    /// The reviewed pull request.
    pub thread: Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    Deleted,
}

impl CommentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentAction::Deleted => "deleted",
        }
    }
}

/// An `issue_comment` delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub repo: RepoId,
    pub installation: InstallationId,
    pub action: CommentAction,

    /// The issue or pull request the comment was on.
    pub number: ThreadNumber,

    pub comment_id: CommentId,

    /// Login of the comment's author.
    pub author_login: String,
}
