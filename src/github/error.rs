//! GitHub API error types.
//!
//! Errors are split into transient and permanent failures so the interpreter
//! knows what to retry:
//!
//! - **Transient**: 5xx, 429, rate-limited 403, network failures, and a few
//!   4xx messages GitHub uses for conditions that clear on their own.
//! - **Permanent**: everything else (missing permissions, not found, merge
//!   refused).
//!
//! A 409 on merge because the head moved is reported as `ShaMismatch`: the
//! caller has to look at the pull request again rather than resend the request.

use std::fmt;
use thiserror::Error;

use crate::types::{Sha, ThreadNumber};

/// The kind of GitHub API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Safe to retry with backoff.
    Transient,

    /// Retrying the same request will fail again.
    Permanent,

    /// The pull request head changed between the readiness check and the merge.
    ShaMismatch,
}

impl GitHubErrorKind {
    /// Returns true if the request itself may be resent.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if the request reached GitHub.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a SHA mismatch error for a merge attempt.
    pub fn sha_mismatch(number: ThreadNumber, expected: &Sha, source: octocrab::Error) -> Self {
        Self {
            kind: GitHubErrorKind::ShaMismatch,
            status_code: Some(409),
            message: format!(
                "head of {} is no longer {}",
                number,
                expected.short()
            ),
            source: Some(source),
        }
    }

    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an octocrab source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for HTTP 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = status_code_of(&err);
        let message = message_of(&err);
        let kind = classify(status_code, &message);

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }
}

/// Decides whether a failure is worth retrying.
fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    if is_transient_message(message) {
        return GitHubErrorKind::Transient;
    }

    match status_code {
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if is_network_error(message) => GitHubErrorKind::Transient,
        None => GitHubErrorKind::Permanent,
    }
}

fn status_code_of(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

fn message_of(err: &octocrab::Error) -> String {
    match err {
        octocrab::Error::GitHub { source, .. } => source.message.clone(),
        other => other.to_string(),
    }
}

/// Checks if an error message indicates a condition that clears on its own.
fn is_transient_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();

    if message_lower.contains("base branch was modified") {
        return true;
    }

    message_lower.contains("try again")
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}

/// Returns true if a 409 merge failure means the head moved.
pub(super) fn is_head_moved_message(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("head branch was modified")
        || (message_lower.contains("sha") && message_lower.contains("match"))
}
