//! Analytics and error-reporting sink.
//!
//! Callers never let a sink failure affect scheduling or job execution: every
//! call site logs and drops the error.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};

use crate::jobs::JobKey;
use crate::types::{ActionKind, RepoId, ThreadNumber};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics sink unavailable: {0}")]
    Unavailable(String),
}

/// Something worth recording outside the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    /// A job was created or rescheduled.
    Scheduled {
        repo: RepoId,
        number: ThreadNumber,
        key: JobKey,
        action: ActionKind,
        label: String,
        fire_at: DateTime<Utc>,
    },

    /// A job failed for a reason other than "not ready yet".
    ActionFailed {
        key: JobKey,
        action: ActionKind,
        attempts: u32,
        error: String,
    },
}

pub trait Analytics: Send + Sync {
    fn track(&self, event: AnalyticsEvent)
    -> impl Future<Output = Result<(), AnalyticsError>> + Send;
}

/// Writes analytics events to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl Analytics for TracingAnalytics {
    async fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        match event {
            AnalyticsEvent::Scheduled {
                repo,
                number,
                key,
                action,
                label,
                fire_at,
            } => info!(
                repo = %repo,
                number = %number,
                key = %key,
                action = %action,
                label,
                fire_at = %fire_at,
                "analytics: job scheduled"
            ),
            AnalyticsEvent::ActionFailed {
                key,
                action,
                attempts,
                error,
            } => error!(
                key = %key,
                action = %action,
                attempts,
                error,
                "analytics: action failed"
            ),
        }
        Ok(())
    }
}
