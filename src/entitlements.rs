//! Entitlement gate for scheduling routes.

use std::collections::HashSet;
use std::future::Future;

use thiserror::Error;

use crate::types::{InstallationId, RepoId};

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("entitlement check failed: {0}")]
    Unavailable(String),
}

/// Decides whether an installation may use the scheduling features.
pub trait Entitlements: Send + Sync {
    fn is_entitled(
        &self,
        repo: &RepoId,
        installation: InstallationId,
    ) -> impl Future<Output = Result<bool, EntitlementError>> + Send;
}

/// Allows a fixed set of owners, compared case-insensitively.
///
/// An empty allowlist allows everyone.
#[derive(Debug, Clone, Default)]
pub struct OwnerAllowlist {
    owners: HashSet<String>,
}

impl OwnerAllowlist {
    pub fn new<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        OwnerAllowlist {
            owners: owners
                .into_iter()
                .map(|o| o.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    fn allows(&self, owner: &str) -> bool {
        self.owners.is_empty() || self.owners.contains(&owner.to_lowercase())
    }
}

impl Entitlements for OwnerAllowlist {
    async fn is_entitled(
        &self,
        repo: &RepoId,
        _installation: InstallationId,
    ) -> Result<bool, EntitlementError> {
        Ok(self.allows(&repo.owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_allowlist_allows_everyone() {
        let gate = OwnerAllowlist::allow_all();
        assert!(
            gate.is_entitled(&RepoId::new("anyone", "r"), InstallationId(1))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn allowlist_is_case_insensitive() {
        let gate = OwnerAllowlist::new(["MFix22"]);
        assert!(
            gate.is_entitled(&RepoId::new("mfix22", "r"), InstallationId(1))
                .await
                .unwrap()
        );
        assert!(
            !gate
                .is_entitled(&RepoId::new("other", "r"), InstallationId(1))
                .await
                .unwrap()
        );
    }
}
