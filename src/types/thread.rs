//! Thread types: the unified view of issues and pull requests.
//!
//! GitHub numbers and labels issues and pull requests through the same API, so
//! the scheduler treats both as a `Thread`.

use serde::{Deserialize, Serialize};

use super::ids::{InstallationId, RepoId, ThreadNumber};

/// Whether a thread is an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
    Issue,
    PullRequest,
}

/// The open/closed state of a thread.
///
/// A merged pull request is `Closed` here; the merge distinction only matters
/// to the merge worker, which reads [`PullState`](super::PullState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    Open,
    Closed,
}

impl ThreadState {
    /// Parses GitHub's `state` string. Anything other than `"closed"` is open.
    pub fn from_api(state: &str) -> Self {
        if state.eq_ignore_ascii_case("closed") {
            ThreadState::Closed
        } else {
            ThreadState::Open
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ThreadState::Closed)
    }
}

/// A snapshot of an issue or pull request as seen in a webhook payload.
///
/// Observed, never mutated: label and state changes come from GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// The repository the thread lives in.
    pub repo: RepoId,

    /// The issue/PR number.
    pub number: ThreadNumber,

    /// Issue or pull request.
    pub kind: ThreadKind,

    /// Open or closed.
    pub state: ThreadState,

    /// Label names currently applied, in the order GitHub reports them.
    pub labels: Vec<String>,

    /// Login of the thread author.
    pub author: String,

    /// The installation the webhook was delivered for.
    pub installation: InstallationId,
}

impl Thread {
    /// Returns true if the thread carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}
