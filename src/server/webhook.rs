//! Webhook endpoint handler.
//!
//! Deliveries are verified, parsed and run through the pipeline before the
//! response is sent. A pipeline failure returns 500 so GitHub records the
//! delivery as failed and it can be redelivered.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::pipeline::{Dispatch, EventSink, PipelineError};
use crate::types::DeliveryId;
use crate::webhooks::{ParseError, parse_webhook, verify_signature};

const HEADER_EVENT: &str = "x-github-event";
const HEADER_DELIVERY: &str = "x-github-delivery";
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ParseError),

    #[error("processing failed: {0}")]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) | WebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// - 200 OK: at least one route handled the delivery
/// - 202 Accepted: no route for this event; nothing was done
/// - 400 Bad Request: missing header or malformed payload
/// - 401 Unauthorized: invalid signature
/// - 500 Internal Server Error: the pipeline failed
pub async fn webhook_handler<S: EventSink>(
    State(app_state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let delivery_id = DeliveryId::new(get_header(&headers, HEADER_DELIVERY)?);
    let signature_header = get_header(&headers, HEADER_SIGNATURE)?;

    debug!(delivery_id = %delivery_id, event_type = %event_type, "Received webhook");

    // Nothing in the body is trusted until the signature checks out.
    if !verify_signature(&body, &signature_header, app_state.webhook_secret()) {
        warn!(delivery_id = %delivery_id, "Invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let Some(event) = parse_webhook(&event_type, &body).inspect_err(|e| {
        warn!(delivery_id = %delivery_id, error = %e, "Malformed webhook payload");
    })?
    else {
        debug!(delivery_id = %delivery_id, event_type = %event_type, "Ignoring event");
        return Ok((StatusCode::ACCEPTED, "Ignored"));
    };

    match app_state.sink().handle(event).await {
        Ok(Dispatch::Handled { routes, handled }) => {
            info!(delivery_id = %delivery_id, routes, handled, "Webhook handled");
            Ok((StatusCode::OK, "OK"))
        }
        Ok(Dispatch::Ignored) => Ok((StatusCode::ACCEPTED, "Ignored")),
        Err(e) => {
            error!(delivery_id = %delivery_id, error = %e, "Failed to process webhook");
            Err(e.into())
        }
    }
}

fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}
