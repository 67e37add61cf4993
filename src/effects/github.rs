//! GitHub API effect types.
//!
//! These types describe GitHub API operations as data, without executing them.
//! The interpreter in `crate::github` executes them against the real API; tests
//! use a recording interpreter instead.

use serde::{Deserialize, Serialize};

use crate::config::MergeMethod;
use crate::types::{CommentId, MergeStateStatus, PullState, Sha, ThreadKind, ThreadNumber, ThreadState};

/// A GitHub API effect.
///
/// Effects are repo-scoped: the interpreter is constructed for one repository,
/// so effects don't include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Queries ──────────────────────────────────────────────────────────────
    /// Fetch an issue or pull request as a thread.
    GetThread { number: ThreadNumber },

    /// Fetch pull-request specific data (head, mergeability).
    GetPull { number: ThreadNumber },

    /// Read a file from the default branch. Missing files are not an error.
    GetConfigFile { path: String },

    // ─── Mutations ────────────────────────────────────────────────────────────
    /// Post a comment on an issue or pull request.
    PostComment { number: ThreadNumber, body: String },

    /// Close an issue or pull request.
    CloseThread { number: ThreadNumber },

    /// Merge a pull request.
    ///
    /// `expected_sha` is passed to the merge endpoint so a push that lands
    /// after the check fails the merge with 409 instead of merging unseen
    /// commits.
    MergePull {
        number: ThreadNumber,
        method: MergeMethod,
        expected_sha: Sha,
    },

    /// Delete a branch (`refs/heads/<branch>`).
    DeleteBranch { branch: String },

    /// Create a lightweight tag pointing at `sha`.
    CreateTag { tag: String, sha: Sha },
}

impl GitHubEffect {
    /// Returns true for effects that only read state.
    ///
    /// Repeating a query after a transient failure is harmless. Repeating a
    /// mutation is not: GitHub may have applied it before the error.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            GitHubEffect::GetThread { .. }
                | GitHubEffect::GetPull { .. }
                | GitHubEffect::GetConfigFile { .. }
        )
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// Thread data returned from the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadData {
    pub number: ThreadNumber,
    pub kind: ThreadKind,
    pub state: ThreadState,
    pub labels: Vec<String>,
    pub author: String,
}

/// Pull request data returned from the pulls API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullData {
    pub number: ThreadNumber,
    pub state: PullState,

    /// GitHub's `mergeable` flag; `None` while it is still being computed.
    pub mergeable: Option<bool>,

    pub merge_state: MergeStateStatus,
    pub head_ref: String,
    pub head_sha: Sha,

    /// Whether the head branch lives in the base repository (not a fork).
    pub same_repo: bool,
}

impl PullData {
    /// Returns true if GitHub reports the pull request as ready to merge now.
    pub fn is_ready_to_merge(&self) -> bool {
        self.state.is_open() && self.mergeable == Some(true) && self.merge_state.is_mergeable()
    }
}

/// Response from a GitHub effect.
///
/// Each variant corresponds to the response from a particular effect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Response to `GetThread`.
    Thread(ThreadData),

    /// Response to `GetPull`.
    Pull(PullData),

    /// Response to `GetConfigFile`; `None` if the file does not exist.
    ConfigFile(Option<String>),

    /// Response to `PostComment`.
    CommentPosted { id: CommentId },

    /// Response to `CloseThread`.
    Closed,

    /// Response to `MergePull`.
    Merged {
        /// The SHA of the merge commit on the base branch.
        sha: Sha,
    },

    /// Response to `DeleteBranch`.
    BranchDeleted,

    /// Response to `CreateTag`.
    TagCreated,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull(mergeable: Option<bool>, merge_state: MergeStateStatus) -> PullData {
        PullData {
            number: ThreadNumber(1),
            state: PullState::Open,
            mergeable,
            merge_state,
            head_ref: "feature".into(),
            head_sha: Sha::new("a".repeat(40)),
            same_repo: true,
        }
    }

    #[test]
    fn ready_to_merge_needs_mergeable_flag_and_state() {
        assert!(pull(Some(true), MergeStateStatus::Clean).is_ready_to_merge());
        assert!(pull(Some(true), MergeStateStatus::Unstable).is_ready_to_merge());
        assert!(!pull(None, MergeStateStatus::Clean).is_ready_to_merge());
        assert!(!pull(Some(false), MergeStateStatus::Clean).is_ready_to_merge());
        assert!(!pull(Some(true), MergeStateStatus::Blocked).is_ready_to_merge());
        assert!(!pull(Some(true), MergeStateStatus::Unknown).is_ready_to_merge());
    }

    #[test]
    fn closed_pull_is_never_ready() {
        let mut data = pull(Some(true), MergeStateStatus::Clean);
        data.state = PullState::Closed;
        assert!(!data.is_ready_to_merge());
    }

    #[test]
    fn only_reads_are_queries() {
        let sha = Sha::new("a".repeat(40));
        let number = ThreadNumber(7);
        let queries = [
            GitHubEffect::GetThread { number },
            GitHubEffect::GetPull { number },
            GitHubEffect::GetConfigFile {
                path: ".github/label-delay.yml".into(),
            },
        ];
        let mutations = [
            GitHubEffect::PostComment {
                number,
                body: "hi".into(),
            },
            GitHubEffect::CloseThread { number },
            GitHubEffect::MergePull {
                number,
                method: MergeMethod::Squash,
                expected_sha: sha.clone(),
            },
            GitHubEffect::DeleteBranch {
                branch: "feature".into(),
            },
            GitHubEffect::CreateTag {
                tag: "pr-7".into(),
                sha,
            },
        ];
        assert!(queries.iter().all(GitHubEffect::is_query));
        assert!(!mutations.iter().any(GitHubEffect::is_query));
    }

    #[test]
    fn effects_serialize_with_type_tag() {
        let effect = GitHubEffect::CloseThread {
            number: ThreadNumber(7),
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json, serde_json::json!({"type": "close_thread", "number": 7}));
    }
}
