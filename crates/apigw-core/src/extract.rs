//! Recovery of the signed `response` text from a raw gateway reply.
//!
//! A signed reply has the shape `{"response": RESPONSE_JSON, "sign": SIGN}`
//! and the signature covers `RESPONSE_JSON` exactly as the gateway wrote it.
//! Re-serializing the parsed value is only good enough when it happens to
//! reproduce the original bytes; otherwise the text is cut out of the body.
//!
//! The fallback scan is brace based: it assumes the `}` found next to the
//! `"sign"` key (or before the envelope's final `}`) is the one closing the
//! response object. A `}` inside a string value positioned after the real
//! closing brace would fool it.

use serde_json::Value;
use tracing::{debug, trace};

/// Envelope field holding the business payload.
pub const RESPONSE_FIELD: &str = "response";

/// Envelope field holding the signature.
pub const SIGN_FIELD: &str = "sign";

const RESPONSE_NODE_KEY: &str = "\"response\"";
const SIGN_NODE_KEY: &str = "\"sign\"";

/// Returns the exact text of the `response` value inside `body`.
///
/// Returns `None` when the body is not JSON or lacks either the
/// `"response"` or the `"sign"` key.
///
/// # Example
///
/// ```rust
/// use apigw_core::extract_response_to_sign;
///
/// let body = r#"{"response":{"a":1,   "c":"hello"}, "sign":"abcde"}"#;
/// assert_eq!(extract_response_to_sign(body), Some(r#"{"a":1,   "c":"hello"}"#));
/// ```
pub fn extract_response_to_sign(body: &str) -> Option<&str> {
    let envelope: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "response body is not valid JSON");
            return None;
        }
    };

    if let Some(candidate) = envelope
        .get(RESPONSE_FIELD)
        .and_then(|response| serde_json::to_string(response).ok())
    {
        if let Some(start) = body.find(&candidate) {
            return Some(&body[start..start + candidate.len()]);
        }
    }

    trace!("canonical response text not found verbatim, scanning body");
    scan_response_object(body)
}

fn scan_response_object(body: &str) -> Option<&str> {
    let response_at = body.find(RESPONSE_NODE_KEY)?;
    let sign_at = body.find(SIGN_NODE_KEY)?;

    let start = response_at + body[response_at..].find('{')?;

    let end = if response_at < sign_at {
        let last_sign = body.rfind(SIGN_NODE_KEY)?;
        body[..last_sign].rfind('}')?
    } else {
        let envelope_end = body.rfind('}')?;
        body[..envelope_end].rfind('}')?
    };

    if end < start {
        debug!(start, end, "response object boundaries are inverted");
        return None;
    }

    Some(&body[start..=end])
}
