//! Effect interpreter trait.

use std::future::Future;

use super::github::{GitHubEffect, GitHubResponse};

/// Interprets GitHub effects against the GitHub API.
///
/// Implementations are constructed for one repository, so all effects executed
/// through a single interpreter instance are scoped to it.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct StaticConfig(String);
///
/// impl GitHubInterpreter for StaticConfig {
///     type Error = anyhow::Error;
///
///     async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
///         match effect {
///             GitHubEffect::GetConfigFile { .. } => {
///                 Ok(GitHubResponse::ConfigFile(Some(self.0.clone())))
///             }
///             other => Err(anyhow!("unexpected effect: {:?}", other)),
///         }
///     }
/// }
/// ```
pub trait GitHubInterpreter: Send + Sync {
    /// The error type returned by this interpreter.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send;
}

impl<T: GitHubInterpreter> GitHubInterpreter for std::sync::Arc<T> {
    type Error = T::Error;

    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, Self::Error>> + Send {
        (**self).interpret(effect)
    }
}
