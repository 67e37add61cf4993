//! Octocrab client wrapper scoped to a specific repository.
//!
//! Effects do not carry a repository, so every interpreter is built for one.
//! A [`ClientFactory`] produces these per webhook delivery or per job.

use octocrab::Octocrab;

use crate::effects::GitHubInterpreter;
use crate::types::{InstallationId, RepoId};

use super::error::GitHubApiError;

/// A GitHub API client scoped to a specific repository.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
    repo: RepoId,
}

impl OctocrabClient {
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self { client, repo }
    }

    /// Creates a client from a GitHub token.
    pub fn from_token(token: impl Into<String>, repo: RepoId) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client, repo))
    }

    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    pub fn repo_name(&self) -> &str {
        &self.repo.repo
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

/// Produces repository-scoped interpreters.
///
/// The installation is passed so an App-authenticated factory can mint an
/// installation token; token-based factories ignore it.
pub trait ClientFactory: Send + Sync + 'static {
    type Client: GitHubInterpreter<Error = GitHubApiError> + 'static;

    fn client_for(
        &self,
        repo: &RepoId,
        installation: InstallationId,
    ) -> Result<Self::Client, GitHubApiError>;
}

/// Builds every client from one shared token-authenticated octocrab instance.
#[derive(Clone)]
pub struct TokenClientFactory {
    client: Octocrab,
}

impl TokenClientFactory {
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self { client })
    }
}

impl ClientFactory for TokenClientFactory {
    type Client = OctocrabClient;

    fn client_for(
        &self,
        repo: &RepoId,
        _installation: InstallationId,
    ) -> Result<Self::Client, GitHubApiError> {
        Ok(OctocrabClient::new(self.client.clone(), repo.clone()))
    }
}

impl std::fmt::Debug for TokenClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClientFactory").finish_non_exhaustive()
    }
}
