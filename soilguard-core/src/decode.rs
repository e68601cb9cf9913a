//! Payload decoding
//!
//! Turns the raw bytes of one broker message into a [`RawMessage`]: a loosely
//! typed key/value map whose fields may be missing, null, or of the wrong type.
//! Typing and defaults are the validator's job; the decoder only guarantees
//! that the payload is a UTF-8 JSON object.
//!
//! Every failure is logged at warning level together with a truncated copy of
//! the payload, then returned. Nothing panics and nothing partial escapes.

use serde_json::{Map, Value};

use crate::constants::PAYLOAD_PREVIEW_BYTES;
use crate::errors::DecodeError;

/// Decoded, untyped message
///
/// Owned by the pipeline for the duration of one message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMessage {
    fields: Map<String, Value>,
}

impl RawMessage {
    /// Wrap an already-parsed JSON object
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Value of a field, treating JSON `null` as absent
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    /// Number of keys in the payload, nulls included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for `{}`
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Payload decoder
#[derive(Debug, Clone)]
pub struct Decoder {
    preview_bytes: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self { preview_bytes: PAYLOAD_PREVIEW_BYTES }
    }
}

impl Decoder {
    /// Create a decoder with a custom log preview length
    pub fn with_preview_bytes(preview_bytes: usize) -> Self {
        Self { preview_bytes }
    }

    /// Decode one payload
    pub fn decode(&self, payload: &[u8]) -> Result<RawMessage, DecodeError> {
        let result = parse(payload);
        if let Err(err) = &result {
            log_warn!(
                "Dropping undecodable payload ({} bytes): {}; payload: {:?}",
                payload.len(),
                err,
                preview(payload, self.preview_bytes)
            );
        }
        result
    }
}

/// Decode with the default decoder
pub fn decode(payload: &[u8]) -> Result<RawMessage, DecodeError> {
    Decoder::default().decode(payload)
}

fn parse(payload: &[u8]) -> Result<RawMessage, DecodeError> {
    let text = core::str::from_utf8(payload).map_err(|e| DecodeError::NotUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;

    let value: Value = serde_json::from_str(text).map_err(|e| DecodeError::Malformed {
        reason: e.to_string(),
        line: e.line(),
        column: e.column(),
    })?;

    match value {
        Value::Object(fields) => Ok(RawMessage::from_map(fields)),
        other => Err(DecodeError::NotAnObject { found: kind_of(&other) }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lossy, length-capped copy of a payload for diagnostics
pub fn preview(payload: &[u8], max_bytes: usize) -> String {
    let cut = payload.len().min(max_bytes);
    let mut text = String::from_utf8_lossy(&payload[..cut]).into_owned();
    if payload.len() > max_bytes {
        text.push_str("...");
    }
    text
}
