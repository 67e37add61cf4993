//! Delayed jobs: identity, storage and execution.
//!
//! - [`key`]: deterministic job keys
//! - [`queue`]: the [`DelayedQueue`] contract and job payloads
//! - [`memory`]: an in-process queue
//! - [`runner`]: the loop that fires due jobs

pub mod key;
pub mod memory;
pub mod queue;
pub mod runner;

pub use key::JobKey;
pub use memory::MemoryQueue;
pub use queue::{DelayedQueue, JobPayload, QueueError, ScheduledJob};
pub use runner::{QueueRunner, RunSummary};
