//! Core domain types for the label delay bot.

pub mod action;
pub mod ids;
pub mod pull;
pub mod thread;

pub use action::ActionKind;
pub use ids::{CommentId, DeliveryId, InstallationId, RepoId, Sha, ThreadNumber};
pub use pull::{MergeStateStatus, PullState};
pub use thread::{Thread, ThreadKind, ThreadState};
