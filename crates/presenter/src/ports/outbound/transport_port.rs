//! Transport Port - publish/subscribe capability under the message channel
//!
//! The channel adapter owns connection policy (fallback endpoints, backoff,
//! queuing); a transport only knows how to open one link and move payloads.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Something that happened on an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A payload arrived on a subscribed topic
    Message { topic: String, payload: String },
    /// The link closed without being asked to
    Closed { reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Endpoint refused or could not be reached
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// Operation requires an open link
    #[error("Not connected")]
    NotConnected,

    /// Broker refused the subscription
    #[error("Subscribe to '{topic}' rejected: {reason}")]
    SubscribeRejected { topic: String, reason: String },

    /// Payload could not be handed to the link
    #[error("Publish failed: {0}")]
    PublishFailed(String),
}

/// Pub/sub transport trait.
///
/// `connect` returns the receiving half of the link's event stream; the link
/// is considered gone once that stream yields `Closed` or ends.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        client_id: &str,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError>;

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError>;

    /// Closes the current link, if any. Never fails.
    async fn disconnect(&self);
}
