//! HTTP server.
//!
//! # Endpoints
//!
//! - `POST /webhook` - GitHub webhook deliveries, handled synchronously
//! - `GET /health` - liveness probe

use std::sync::Arc;

use crate::pipeline::EventSink;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{WebhookError, webhook_handler};

/// Shared application state, passed to handlers via axum's `State` extractor.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            inner: self.inner.clone(),
        }
    }
}

struct AppStateInner<S> {
    /// Receives every verified, parsed delivery.
    sink: S,

    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,
}

impl<S: EventSink> AppState<S> {
    pub fn new(sink: S, webhook_secret: impl Into<Vec<u8>>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                sink,
                webhook_secret: webhook_secret.into(),
            }),
        }
    }

    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<S: EventSink>(app_state: AppState<S>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler::<S>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
