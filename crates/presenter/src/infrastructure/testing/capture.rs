//! Publisher whose output lands in the test instead of on a channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use whiskers_protocol::OutboundMessage;

use crate::infrastructure::messaging::{ChannelCommand, ChannelPublisher};
use crate::ports::outbound::ClockPort;

pub struct CapturedOutbound {
    rx: mpsc::UnboundedReceiver<ChannelCommand>,
}

impl CapturedOutbound {
    /// Everything published so far.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            if let ChannelCommand::Publish(envelope) = command {
                out.push(envelope.message);
            }
        }
        out
    }

    pub fn drain_kinds(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(OutboundMessage::kind).collect()
    }

    /// Waits for the next message of `kind`, skipping others.
    pub async fn next_of(&mut self, kind: &str, within: Duration) -> Option<OutboundMessage> {
        tokio::time::timeout(within, async {
            while let Some(command) = self.rx.recv().await {
                if let ChannelCommand::Publish(envelope) = command {
                    if envelope.message.kind() == kind {
                        return Some(envelope.message);
                    }
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }
}

pub fn capture_publisher(clock: Arc<dyn ClockPort>) -> (ChannelPublisher, CapturedOutbound) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelPublisher::new(tx, clock), CapturedOutbound { rx })
}
