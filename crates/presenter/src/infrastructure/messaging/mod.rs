//! Messaging infrastructure - the pub/sub channel to the orchestrator.

mod backoff;
mod channel;
mod connection;
mod outbound_queue;

pub use backoff::BackoffState;
pub use channel::{
    create_channel, generate_client_id, Channel, ChannelAdapter, ChannelCommand,
    ChannelPublisher, ConnectionError,
};
pub use connection::{ChannelStatus, ConnectionState, ConnectionStateObserver};
pub use outbound_queue::OutboundQueue;
