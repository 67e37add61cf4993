//! Label Delay Bot - schedules delayed actions on GitHub issues and pull
//! requests when labels are applied.
//!
//! A label listed in a repository's configuration schedules a job that closes
//! the thread, merges the pull request or posts a comment once a delay has
//! passed. Removing the label, closing the thread or deleting the bot's notice
//! cancels it.

pub mod analytics;
pub mod config;
pub mod effects;
pub mod entitlements;
pub mod github;
pub mod jobs;
pub mod labels;
pub mod pipeline;
pub mod scheduler;
pub mod server;
pub mod types;
pub mod webhooks;
pub mod worker;

#[cfg(test)]
mod test_utils;
