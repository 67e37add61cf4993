//! Pull request state as needed by the merge worker.

use serde::{Deserialize, Serialize};

use super::ids::Sha;

/// The state of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullState {
    /// The PR is open.
    Open,

    /// The PR was merged.
    Merged {
        /// The merge commit, when GitHub has computed it.
        merge_commit_sha: Option<Sha>,
    },

    /// The PR was closed without merging.
    Closed,
}

impl PullState {
    pub fn is_open(&self) -> bool {
        matches!(self, PullState::Open)
    }
}

/// GitHub's `mergeable_state`, describing whether a PR can be merged now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStateStatus {
    /// All requirements satisfied.
    Clean,

    /// Non-required checks failing; merging is still allowed.
    Unstable,

    /// Required checks or reviews missing.
    Blocked,

    /// Head branch behind base (strict mode).
    Behind,

    /// Merge conflicts exist.
    Dirty,

    /// Not yet computed by GitHub.
    Unknown,

    /// PR is a draft.
    Draft,

    /// Repository has pre-receive hooks; merging is allowed.
    HasHooks,
}

impl MergeStateStatus {
    /// Parses the REST API's `mergeable_state` string.
    ///
    /// Unrecognised values map to `Unknown`, which makes the merge worker wait.
    pub fn from_api(state: &str) -> Self {
        match state {
            "clean" => MergeStateStatus::Clean,
            "unstable" => MergeStateStatus::Unstable,
            "blocked" => MergeStateStatus::Blocked,
            "behind" => MergeStateStatus::Behind,
            "dirty" => MergeStateStatus::Dirty,
            "draft" => MergeStateStatus::Draft,
            "has_hooks" => MergeStateStatus::HasHooks,
            _ => MergeStateStatus::Unknown,
        }
    }

    /// Returns true if the PR can be merged right now.
    pub fn is_mergeable(&self) -> bool {
        matches!(
            self,
            MergeStateStatus::Clean | MergeStateStatus::Unstable | MergeStateStatus::HasHooks
        )
    }
}
