//! Response envelope decoding
//!
//! The Defect Control API wraps payloads as `{"status": "ok", "data": ...}` but
//! some endpoints answer with the bare record. Every response body passes
//! through this module so the rest of the client only ever sees typed payloads.
//!
//! # Contract
//!
//! 1. An empty body decodes as JSON `null`
//! 2. A top-level object with a `data` key yields that value as the payload
//! 3. A top-level object with `"status": "error"` and no `data` is a rejection
//! 4. Anything else is the payload itself
//!
//! Lists additionally treat a `null` payload as empty, because the API
//! serializes empty collections as `null`.
//!
//! # Example
//!
//! ```
//! use defect_control_shared::envelope::{decode, decode_list};
//! use defect_control_shared::models::project::Project;
//!
//! let wrapped = br#"{"status":"ok","data":{"id":1,"name":"Tower A","address":"Main st. 1"}}"#;
//! let bare = br#"{"id":1,"name":"Tower A","address":"Main st. 1"}"#;
//!
//! let a: Project = decode(wrapped).unwrap();
//! let b: Project = decode(bare).unwrap();
//! assert_eq!(a, b);
//!
//! let empty: Vec<Project> = decode_list(br#"{"status":"ok","data":null}"#).unwrap();
//! assert!(empty.is_empty());
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Error type for envelope decoding
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Body is not valid JSON
    #[error("Malformed response body: {0}")]
    Malformed(String),

    /// Envelope reported an error status
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Payload does not match the expected shape
    #[error("Unexpected payload shape: {0}")]
    Shape(String),
}

/// Parses a raw body into a JSON value, treating an empty body as `null`
fn parse_body(body: &[u8]) -> Result<Value, EnvelopeError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(body).map_err(|e| EnvelopeError::Malformed(e.to_string()))
}

/// Extracts the payload from an already parsed response value
///
/// # Errors
///
/// Returns `EnvelopeError::Rejected` when the envelope carries an error status
/// and no payload.
pub fn unwrap_payload(value: Value) -> Result<Value, EnvelopeError> {
    match value {
        Value::Object(mut map) => {
            if let Some(data) = map.remove("data") {
                return Ok(data);
            }

            let is_error = map
                .get("status")
                .and_then(Value::as_str)
                .map(|s| s.eq_ignore_ascii_case("error"))
                .unwrap_or(false);

            if is_error {
                let message = message_from_map(&map).unwrap_or_else(|| "unknown error".to_string());
                return Err(EnvelopeError::Rejected(message));
            }

            Ok(Value::Object(map))
        }
        other => Ok(other),
    }
}

/// Decodes a response body into a typed payload
///
/// # Errors
///
/// Returns an error if the body is not JSON, the envelope is a rejection, or
/// the payload does not deserialize into `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, EnvelopeError> {
    let payload = unwrap_payload(parse_body(body)?)?;
    serde_json::from_value(payload).map_err(|e| EnvelopeError::Shape(e.to_string()))
}

/// Decodes a response body into a list, mapping a `null` payload to empty
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_list<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, EnvelopeError> {
    match unwrap_payload(parse_body(body)?)? {
        Value::Null => Ok(Vec::new()),
        payload => serde_json::from_value(payload).map_err(|e| EnvelopeError::Shape(e.to_string())),
    }
}

/// Extracts a human-readable error message from an error response body
///
/// Looks at the `error` field first and falls back to `message`.
pub fn error_message(body: &[u8]) -> Option<String> {
    match parse_body(body).ok()? {
        Value::Object(map) => message_from_map(&map),
        _ => None,
    }
}

fn message_from_map(map: &serde_json::Map<String, Value>) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|key| map.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: u64,
        name: String,
    }

    #[test]
    fn test_decode_wrapped_and_bare() {
        let wrapped: Thing = decode(br#"{"status":"ok","data":{"id":7,"name":"x"}}"#).unwrap();
        let bare: Thing = decode(br#"{"id":7,"name":"x"}"#).unwrap();

        assert_eq!(wrapped, Thing { id: 7, name: "x".to_string() });
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn test_decode_list_null_is_empty() {
        let list: Vec<Thing> = decode_list(br#"{"status":"ok","data":null}"#).unwrap();
        assert!(list.is_empty());

        let list: Vec<Thing> = decode_list(b"").unwrap();
        assert!(list.is_empty());

        let list: Vec<Thing> = decode_list(br#"[{"id":1,"name":"a"}]"#).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_error_status_is_rejected() {
        let result: Result<Thing, _> = decode(br#"{"status":"error","error":"invalid credentials"}"#);

        match result {
            Err(EnvelopeError::Rejected(msg)) => assert_eq!(msg, "invalid credentials"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let result: Result<Thing, _> = decode(br#"{"data":{"id":"not-a-number"}}"#);
        assert!(matches!(result, Err(EnvelopeError::Shape(_))));
    }

    #[test]
    fn test_malformed_body() {
        let result: Result<Thing, _> = decode(b"<html>bad gateway</html>");
        assert!(matches!(result, Err(EnvelopeError::Malformed(_))));
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(br#"{"status":"error","error":"forbidden","message":"other"}"#),
            Some("forbidden".to_string())
        );
        assert_eq!(
            error_message(br#"{"message":"project not found"}"#),
            Some("project not found".to_string())
        );
        assert_eq!(error_message(br#"{"error":"   "}"#), None);
        assert_eq!(error_message(b"plain text"), None);
    }
}
