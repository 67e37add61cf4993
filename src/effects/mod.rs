//! Effects-as-data for GitHub operations.
//!
//! Scheduling and job execution describe what they want done as
//! [`GitHubEffect`] values and hand them to a [`GitHubInterpreter`]. This keeps
//! the core logic testable with a recording interpreter and makes every
//! outbound call visible in one place.

pub mod github;
pub mod interpreter;

pub use github::{GitHubEffect, GitHubResponse, PullData, ThreadData};
pub use interpreter::GitHubInterpreter;
