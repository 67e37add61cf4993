//! Webhook signature verification.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw body, keyed by the
//! webhook secret, and sends the digest as `X-Hub-Signature-256: sha256=<hex>`.
//! Deliveries are verified before anything in the body is looked at.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "sha256=";

/// Decodes an `X-Hub-Signature-256` header value into the raw digest.
///
/// Returns `None` for any other algorithm or for invalid hex.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    hex::decode(header.strip_prefix(PREFIX)?).ok()
}

/// HMAC-SHA256 of `payload` under `secret`.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a digest the way GitHub sends it.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{PREFIX}{}", hex::encode(signature))
}

/// Returns true if `signature_header` is the signature of `payload` under
/// `secret`. The comparison is constant-time.
///
/// ```
/// use label_delay_bot::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let body = br#"{"action":"labeled"}"#;
/// let header = format_signature_header(&compute_signature(body, b"s3cret"));
///
/// assert!(verify_signature(body, &header, b"s3cret"));
/// assert!(!verify_signature(body, &header, b"other"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected) = parse_signature_header(signature_header) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
