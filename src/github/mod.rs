//! GitHub API client and effect interpreter.
//!
//! Executes [`crate::effects::GitHubEffect`]s through octocrab.
//!
//! - Exponential backoff retry for transient failures
//! - Transient vs permanent error classification
//! - SHA guard on merge so a late push is never merged unseen

mod client;
mod error;
mod interpreter;
mod retry;

pub use client::{ClientFactory, OctocrabClient, TokenClientFactory};
pub use error::{GitHubApiError, GitHubErrorKind};
pub use interpreter::{interpret_github_effect, resolve_merge_state};
pub use retry::{RetryConfig, RetryResult, retry_with_backoff};
