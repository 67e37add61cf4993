//! GitHub webhook handling.
//!
//! - [`signature`]: HMAC-SHA256 verification of deliveries
//! - [`events`]: typed events for the deliveries the bot reacts to
//! - [`parser`]: raw JSON to typed events

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{
    CommentAction, CommentEvent, EventName, ReviewAction, ReviewEvent, ReviewState, ThreadAction,
    ThreadEvent, WebhookEvent,
};
pub use parser::{ParseError, parse_webhook};
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_signature,
};
