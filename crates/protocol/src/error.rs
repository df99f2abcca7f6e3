//! Wire protocol errors.

use thiserror::Error;

/// Reasons an envelope could not be decoded or encoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is not valid JSON
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// Payload is JSON but not an object
    #[error("Envelope is not a JSON object")]
    NotAnObject,

    /// `type` or `timestamp` absent or not a string
    #[error("Envelope is missing required field '{0}'")]
    MissingField(&'static str),

    /// `timestamp` present but not RFC 3339
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Known `type` with fields that do not match it
    #[error("Invalid '{kind}' payload: {reason}")]
    InvalidPayload { kind: String, reason: String },

    /// Outbound envelope could not be serialized
    #[error("Failed to serialize '{kind}': {reason}")]
    Serialize { kind: &'static str, reason: String },
}

impl ProtocolError {
    /// Whether the envelope failed the basic `type`/`timestamp` shape check,
    /// as opposed to not being JSON at all or carrying a bad payload.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::NotAnObject | Self::MissingField(_) | Self::InvalidTimestamp { .. }
        )
    }
}
