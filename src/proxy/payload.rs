//! Inbound payload checks.
//!
//! Payloads are opaque JSON objects. The gateway only checks that the
//! fields the backend cannot do without are present; everything else,
//! `stream` included, goes upstream untouched.

use serde_json::{Map, Value};
use thiserror::Error;

/// Fields required by `/api/generate`.
pub const PROMPT_FIELDS: &[&str] = &["model", "prompt"];

/// Fields required by `/api/chat`.
pub const CHAT_FIELDS: &[&str] = &["model", "messages"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required parameters")]
    MissingParameters { missing: Vec<&'static str> },
}

/// Parse `body` as a JSON object and require `fields` to be present.
///
/// A field holding `null` counts as missing, and so does every field of a
/// body that is not a JSON object.
pub fn require_fields(
    body: &[u8],
    fields: &[&'static str],
) -> Result<Map<String, Value>, ValidationError> {
    let object = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => object,
        _ => {
            return Err(ValidationError::MissingParameters {
                missing: fields.to_vec(),
            })
        }
    };

    let missing: Vec<&'static str> = fields
        .iter()
        .copied()
        .filter(|field| object.get(*field).map_or(true, Value::is_null))
        .collect();

    if missing.is_empty() {
        Ok(object)
    } else {
        Err(ValidationError::MissingParameters { missing })
    }
}

/// `stream` flag of a validated payload, false when absent or not a bool.
pub fn wants_stream(payload: &Map<String, Value>) -> bool {
    payload.get("stream").and_then(Value::as_bool).unwrap_or(false)
}
