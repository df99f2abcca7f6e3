//! Whiskers Protocol - envelopes exchanged over the pub/sub channel
//!
//! Every envelope is a flat JSON object carrying a `type` tag, an RFC 3339
//! `timestamp` and the type-specific fields:
//!
//! ```json
//! {"type": "make_choice", "choiceIndex": 1, "timestamp": "2024-01-15T10:30:00.000Z"}
//! ```
//!
//! The orchestrator sends [`InboundMessage`]s; the presenter answers with
//! [`OutboundMessage`]s.

pub mod envelope;
pub mod error;
pub mod messages;

pub use envelope::{decode_inbound, encode, Envelope};
pub use error::ProtocolError;
pub use messages::{
    AudioStatus, Direction, FeaturesEnabled, InboundMessage, InputContext, MinigameStatus,
    OutboundMessage,
};
