//! Timestamped envelopes and their JSON codec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use whiskers_domain::common::parse_datetime;

use crate::error::ProtocolError;
use crate::messages::{InboundMessage, OutboundMessage};

/// A message plus the moment it was produced.
///
/// Serializes flat: the message's `type` and fields sit next to `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<M> {
    #[serde(flatten)]
    pub message: M,
    #[serde(with = "wire_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl<M> Envelope<M> {
    pub fn new(message: M, timestamp: DateTime<Utc>) -> Self {
        Self { message, timestamp }
    }
}

mod wire_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use whiskers_domain::common::{format_datetime, parse_datetime};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_datetime(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_datetime(&raw).map_err(serde::de::Error::custom)
    }
}

/// Decodes one inbound payload.
///
/// The shape check (`type` and `timestamp` present as strings, timestamp
/// RFC 3339) runs before the payload is matched against a message type, so
/// callers can tell a malformed envelope from a bad payload. An unrecognized
/// `type` decodes to [`InboundMessage::Unknown`].
pub fn decode_inbound(raw: &str) -> Result<Envelope<InboundMessage>, ProtocolError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
    let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("type"))?
        .to_string();
    let timestamp = object
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("timestamp"))?;
    if let Err(e) = parse_datetime(timestamp) {
        return Err(ProtocolError::InvalidTimestamp {
            value: timestamp.to_string(),
            reason: e.to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
        kind,
        reason: e.to_string(),
    })
}

/// Encodes one outbound envelope.
pub fn encode(envelope: &Envelope<OutboundMessage>) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(|e| ProtocolError::Serialize {
        kind: envelope.message.kind(),
        reason: e.to_string(),
    })
}
