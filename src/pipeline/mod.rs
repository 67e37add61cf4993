//! Event routing.
//!
//! Each delivery is matched against [`ROUTES`], an explicit table of
//! `event.action` names, the stages to run first and the handler. One delivery
//! can match several routes (a labelled issue feeds both the comment and the
//! close scheduler); they run in table order and share one GitHub client, one
//! configuration fetch and one entitlement check.
//!
//! | events | stages | handler |
//! |---|---|---|
//! | `issues.labeled/unlabeled`, `pull_request.labeled/unlabeled` | entitlement, log | schedule comment |
//! | `issues.labeled/unlabeled` | entitlement, log | schedule close |
//! | `pull_request.labeled/unlabeled/synchronize`, `pull_request_review.submitted` | entitlement, log | schedule merge |
//! | `issues.closed`, `pull_request.closed` | log | cancel all |
//! | `issue_comment.deleted` | log | cancel all, if the bot wrote the comment |

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::analytics::Analytics;
use crate::config::{ConfigError, DEFAULT_CONFIG_PATH, RepoConfig, fetch_repo_config};
use crate::entitlements::{EntitlementError, Entitlements};
use crate::github::{ClientFactory, GitHubApiError};
use crate::jobs::DelayedQueue;
use crate::scheduler::{ActionScheduler, ScheduleOutcome, SchedulerError};
use crate::types::{ActionKind, ThreadKind};
use crate::webhooks::{EventName, WebhookEvent};


#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    #[error("failed to create GitHub client: {0}")]
    Client(#[source] GitHubApiError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A check that runs before a route's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Skip the route unless the installation may use scheduling.
    Entitlement,
    /// Log the delivery.
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Bring the pending job for this action in line with the thread's labels.
    Schedule(ActionKind),
    /// Cancel every pending job for the thread.
    CancelAll,
    /// Cancel every pending job if the deleted comment was the bot's notice.
    Dismiss,
}

#[derive(Debug)]
pub struct Route {
    pub events: &'static [EventName],
    pub stages: &'static [Stage],
    pub handler: Handler,
}

const ISSUES_LABELED: EventName = EventName::new("issues", "labeled");
const ISSUES_UNLABELED: EventName = EventName::new("issues", "unlabeled");
const ISSUES_CLOSED: EventName = EventName::new("issues", "closed");
const PR_LABELED: EventName = EventName::new("pull_request", "labeled");
const PR_UNLABELED: EventName = EventName::new("pull_request", "unlabeled");
const PR_SYNCHRONIZE: EventName = EventName::new("pull_request", "synchronize");
const PR_CLOSED: EventName = EventName::new("pull_request", "closed");
const REVIEW_SUBMITTED: EventName = EventName::new("pull_request_review", "submitted");
const COMMENT_DELETED: EventName = EventName::new("issue_comment", "deleted");

const SCHEDULING: &[Stage] = &[Stage::Entitlement, Stage::Log];

pub const ROUTES: &[Route] = &[
    Route {
        events: &[ISSUES_LABELED, ISSUES_UNLABELED, PR_LABELED, PR_UNLABELED],
        stages: SCHEDULING,
        handler: Handler::Schedule(ActionKind::Comment),
    },
    Route {
        events: &[ISSUES_LABELED, ISSUES_UNLABELED],
        stages: SCHEDULING,
        handler: Handler::Schedule(ActionKind::Close),
    },
    Route {
        events: &[PR_LABELED, PR_UNLABELED, PR_SYNCHRONIZE, REVIEW_SUBMITTED],
        stages: SCHEDULING,
        handler: Handler::Schedule(ActionKind::Merge),
    },
    Route {
        events: &[ISSUES_CLOSED, PR_CLOSED],
        stages: &[Stage::Log],
        handler: Handler::CancelAll,
    },
    Route {
        events: &[COMMENT_DELETED],
        stages: &[Stage::Log],
        handler: Handler::Dismiss,
    },
];

/// Routes matching an event, in table order.
pub fn routes_for(name: EventName) -> impl Iterator<Item = &'static Route> {
    ROUTES.iter().filter(move |route| route.events.contains(&name))
}

/// What happened to a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// At least one route matched. `handled` counts routes whose handler ran.
    Handled { routes: usize, handled: usize },
    /// No route for this event.
    Ignored,
}

/// Receives parsed webhook events. Implemented by [`Pipeline`]; the HTTP
/// layer depends only on this.
pub trait EventSink: Send + Sync + 'static {
    fn handle(&self, event: WebhookEvent) -> impl Future<Output = Result<Dispatch>> + Send;
}

/// Per-delivery state shared by every matched route.
struct Delivery<'a, C> {
    event: &'a WebhookEvent,
    client: C,
    config: Option<RepoConfig>,
    entitled: Option<bool>,
}

pub struct Pipeline<F, Q, A, E> {
    factory: Arc<F>,
    scheduler: ActionScheduler<Q, A>,
    entitlements: Arc<E>,
    config_path: String,
    bot_login: String,
}

impl<F, Q, A, E> Pipeline<F, Q, A, E>
where
    F: ClientFactory,
    Q: DelayedQueue,
    A: Analytics,
    E: Entitlements,
{
    pub fn new(
        factory: Arc<F>,
        scheduler: ActionScheduler<Q, A>,
        entitlements: Arc<E>,
        bot_login: impl Into<String>,
    ) -> Self {
        Pipeline {
            factory,
            scheduler,
            entitlements,
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            bot_login: bot_login.into(),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn scheduler(&self) -> &ActionScheduler<Q, A> {
        &self.scheduler
    }

    /// Runs every route matching the event.
    #[instrument(skip_all, fields(event = %event.name(), repo = %event.repo()))]
    pub async fn dispatch(&self, event: &WebhookEvent, now: DateTime<Utc>) -> Result<Dispatch> {
        let routes: Vec<&Route> = routes_for(event.name()).collect();
        if routes.is_empty() {
            debug!("No route for event");
            return Ok(Dispatch::Ignored);
        }

        let client = self
            .factory
            .client_for(event.repo(), event.installation())
            .map_err(PipelineError::Client)?;
        let mut delivery = Delivery {
            event,
            client,
            config: None,
            entitled: None,
        };

        let mut handled = 0;
        for route in &routes {
            if self.run_stages(route, &mut delivery).await? {
                self.run_handler(route.handler, &mut delivery, now).await?;
                handled += 1;
            }
        }

        Ok(Dispatch::Handled {
            routes: routes.len(),
            handled,
        })
    }

    /// Returns false if a stage stopped the route.
    async fn run_stages(
        &self,
        route: &Route,
        delivery: &mut Delivery<'_, F::Client>,
    ) -> Result<bool> {
        for stage in route.stages {
            match stage {
                Stage::Entitlement => {
                    if !self.entitled(delivery).await? {
                        info!(handler = ?route.handler, "Installation not entitled, skipping");
                        return Ok(false);
                    }
                }
                Stage::Log => {
                    info!(
                        installation = %delivery.event.installation().0,
                        handler = ?route.handler,
                        "Handling event"
                    );
                }
            }
        }
        Ok(true)
    }

    async fn run_handler(
        &self,
        handler: Handler,
        delivery: &mut Delivery<'_, F::Client>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = delivery.event;
        match handler {
            Handler::Schedule(kind) => {
                let Some(thread) = event.thread() else {
                    return Ok(());
                };
                if kind == ActionKind::Merge && thread.kind != ThreadKind::PullRequest {
                    return Ok(());
                }

                let config = self.config(&delivery.client, &mut delivery.config).await?;
                let outcome = self
                    .scheduler
                    .on_label_change(&delivery.client, config, thread, kind, now)
                    .await?;
                if !matches!(outcome, ScheduleOutcome::Cancelled { removed: false }) {
                    debug!(?outcome, "Label change handled");
                }
            }
            Handler::CancelAll => {
                if let Some(thread) = event.thread() {
                    self.scheduler
                        .cancel_all(&thread.repo, thread.number)
                        .await?;
                }
            }
            Handler::Dismiss => {
                if let WebhookEvent::IssueComment(comment) = event {
                    if comment.author_login.eq_ignore_ascii_case(&self.bot_login) {
                        let removed = self
                            .scheduler
                            .cancel_all(&comment.repo, comment.number)
                            .await?;
                        info!(number = %comment.number, removed, "Notice deleted, dismissed pending jobs");
                    } else {
                        debug!(author = %comment.author_login, "Deleted comment is not ours");
                    }
                }
            }
        }
        Ok(())
    }

    /// The repository configuration, fetched on first use.
    async fn config<'d>(
        &self,
        client: &F::Client,
        cache: &'d mut Option<RepoConfig>,
    ) -> Result<&'d RepoConfig> {
        let config = match cache.take() {
            Some(config) => config,
            None => fetch_repo_config(client, &self.config_path).await?,
        };
        Ok(cache.insert(config))
    }

    async fn entitled(&self, delivery: &mut Delivery<'_, F::Client>) -> Result<bool> {
        if let Some(entitled) = delivery.entitled {
            return Ok(entitled);
        }
        let entitled = self
            .entitlements
            .is_entitled(delivery.event.repo(), delivery.event.installation())
            .await?;
        delivery.entitled = Some(entitled);
        Ok(entitled)
    }
}

impl<F, Q, A, E> EventSink for Pipeline<F, Q, A, E>
where
    F: ClientFactory,
    Q: DelayedQueue + 'static,
    A: Analytics + 'static,
    E: Entitlements + 'static,
{
    async fn handle(&self, event: WebhookEvent) -> Result<Dispatch> {
        self.dispatch(&event, Utc::now()).await
    }
}
