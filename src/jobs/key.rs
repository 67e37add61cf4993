//! Deterministic job identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ActionKind, RepoId, ThreadNumber};

/// Identifies the single pending job for a (thread, action) pair.
///
/// Close jobs use `owner:repo:number`; other actions append `:action`, so a
/// thread can have one pending job of each kind at the same time. GitHub
/// owner and repository names cannot contain `:`, which keeps keys
/// collision-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn for_thread(repo: &RepoId, number: ThreadNumber, action: ActionKind) -> Self {
        match action {
            ActionKind::Close => JobKey(format!("{}:{}:{}", repo.owner, repo.repo, number.0)),
            other => JobKey(format!(
                "{}:{}:{}:{}",
                repo.owner, repo.repo, number.0, other
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
