//! Message Channel Adapter - owns the pub/sub link for the presenter.
//!
//! `create_channel` spawns one task that:
//! - connects to the primary endpoint, then the fallback once
//! - subscribes to the inbound topic (retried in the background)
//! - validates inbound payloads and forwards envelopes in arrival order
//! - publishes outbound envelopes, queueing them while disconnected
//! - reconnects with exponential backoff until the attempt cap, then parks
//!   in `Failed` while still accepting (and queueing) publishes

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use whiskers_protocol::{decode_inbound, encode, Envelope, InboundMessage, OutboundMessage};

use super::backoff::BackoffState;
use super::connection::{ChannelStatus, ConnectionState, ConnectionStateObserver};
use super::outbound_queue::OutboundQueue;
use crate::config::ChannelConfig;
use crate::ports::outbound::{
    ClockPort, PubSubTransport, RandomPort, TransportError, TransportEvent,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Endpoint did not answer within the connect timeout
    #[error("Connecting to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// Endpoint answered with an error
    #[error("Connecting to {url} failed: {source}")]
    Refused {
        url: String,
        #[source]
        source: TransportError,
    },
}

/// Requests sent from the application into the channel task.
#[derive(Debug)]
pub enum ChannelCommand {
    Publish(Envelope<OutboundMessage>),
    Shutdown,
}

/// Cloneable, non-blocking handle for publishing.
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<ChannelCommand>,
    clock: Arc<dyn ClockPort>,
}

impl ChannelPublisher {
    pub fn new(tx: mpsc::UnboundedSender<ChannelCommand>, clock: Arc<dyn ClockPort>) -> Self {
        Self { tx, clock }
    }

    /// Stamps `message` with the current time and hands it to the channel.
    pub fn publish(&self, message: OutboundMessage) {
        self.publish_at(message, self.clock.now());
    }

    pub fn publish_at(&self, message: OutboundMessage, timestamp: DateTime<Utc>) {
        let kind = message.kind();
        if self
            .tx
            .send(ChannelCommand::Publish(Envelope::new(message, timestamp)))
            .is_err()
        {
            tracing::warn!(kind, "Channel task is gone, dropping outbound message");
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Asks the channel task to disconnect and exit. Returns `false` when it
    /// had already gone.
    pub fn shutdown(&self) -> bool {
        if self.tx.send(ChannelCommand::Shutdown).is_err() {
            tracing::debug!("Channel task already gone, nothing to shut down");
            return false;
        }
        true
    }
}

/// `<prefix>_<unix-millis>_<8 hex chars>`
pub fn generate_client_id(prefix: &str, clock: &dyn ClockPort, random: &dyn RandomPort) -> String {
    let suffix = random.gen_uuid().simple().to_string();
    let suffix = suffix.get(..8).unwrap_or(&suffix);
    format!("{prefix}_{}_{suffix}", clock.now().timestamp_millis())
}

/// Result of creating a channel.
///
/// - `publisher`: send envelopes to the orchestrator
/// - `inbound`: validated envelopes from the orchestrator, in arrival order
/// - `state_observer`: connection state for the presenter
/// - `task`: the channel task, finished after `publisher.shutdown()`
pub struct Channel {
    pub publisher: ChannelPublisher,
    pub inbound: mpsc::UnboundedReceiver<Envelope<InboundMessage>>,
    pub state_observer: ConnectionStateObserver,
    pub task: JoinHandle<()>,
}

pub fn create_channel(
    transport: Arc<dyn PubSubTransport>,
    config: ChannelConfig,
    client_id: String,
    clock: Arc<dyn ClockPort>,
) -> Channel {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (adapter, inbound, state_observer) = ChannelAdapter::new(transport, config, client_id);
    let task = tokio::spawn(adapter.run(cmd_rx));

    Channel {
        publisher: ChannelPublisher::new(cmd_tx, clock),
        inbound,
        state_observer,
        task,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Shutdown,
}

enum Wake {
    Command(Option<ChannelCommand>),
    Link(Option<TransportEvent>),
}

/// The state owned by the channel task.
pub struct ChannelAdapter {
    transport: Arc<dyn PubSubTransport>,
    config: ChannelConfig,
    client_id: String,
    status: watch::Sender<ChannelStatus>,
    inbound: mpsc::UnboundedSender<Envelope<InboundMessage>>,
    link: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    queue: OutboundQueue,
    backoff: BackoffState,
    topics: Vec<String>,
    /// Subscription tasks for the current link, keyed by topic
    subscriptions: HashMap<String, JoinHandle<()>>,
}

impl ChannelAdapter {
    pub fn new(
        transport: Arc<dyn PubSubTransport>,
        config: ChannelConfig,
        client_id: String,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<Envelope<InboundMessage>>,
        ConnectionStateObserver,
    ) {
        let (status, status_rx) = watch::channel(ChannelStatus::default());
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let observer = ConnectionStateObserver::new(status_rx, client_id.clone());
        let backoff = BackoffState::new(config.backoff.clone());
        let topics = vec![config.subscribe_topic.clone()];

        let adapter = Self {
            transport,
            config,
            client_id,
            status,
            inbound: inbound_tx,
            link: None,
            queue: OutboundQueue::default(),
            backoff,
            topics,
            subscriptions: HashMap::new(),
        };
        (adapter, inbound_rx, observer)
    }

    fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    fn set_state(&self, state: ConnectionState) {
        let attempts = self.backoff.attempts();
        self.status.send_if_modified(|status| {
            let changed = status.state != state || status.reconnect_attempts != attempts;
            status.state = state;
            status.reconnect_attempts = attempts;
            changed
        });
    }

    fn sync_queued(&self) {
        let queued = self.queue.len();
        self.status.send_if_modified(|status| {
            let changed = status.queued != queued;
            status.queued = queued;
            changed
        });
    }

    /// Connects to the primary endpoint, falling back once to the secondary.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.set_state(ConnectionState::Connecting);
        let result = self.establish().await;
        if result.is_err() {
            self.set_state(ConnectionState::Disconnected);
        }
        result
    }

    async fn establish(&mut self) -> Result<(), ConnectionError> {
        let endpoints: Vec<String> = std::iter::once(self.config.primary_url.clone())
            .chain(self.config.fallback_url.clone())
            .collect();

        let mut last_error = None;
        for url in endpoints {
            let attempt = tokio::time::timeout(
                self.config.connect_timeout,
                self.transport.connect(&url, &self.client_id),
            )
            .await;

            match attempt {
                Ok(Ok(link)) => {
                    tracing::info!(url = %url, client_id = %self.client_id, "Connected to broker");
                    self.on_connected(link).await;
                    return Ok(());
                }
                Ok(Err(source)) => {
                    tracing::warn!(url = %url, error = %source, "Connection attempt failed");
                    last_error = Some(ConnectionError::Refused { url, source });
                }
                Err(_) => {
                    tracing::warn!(url = %url, "Connection attempt timed out");
                    last_error = Some(ConnectionError::Timeout {
                        url,
                        timeout: self.config.connect_timeout,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ConnectionError::Refused {
            url: self.config.primary_url.clone(),
            source: TransportError::Unreachable("no endpoints configured".to_string()),
        }))
    }

    async fn on_connected(&mut self, link: mpsc::UnboundedReceiver<TransportEvent>) {
        self.link = Some(link);
        self.backoff.reset();
        self.set_state(ConnectionState::Connected);

        for topic in self.topics.clone() {
            self.subscribe(&topic);
        }

        self.flush_queue().await;
    }

    /// Idempotent; retries in the background without holding up publishes.
    pub fn subscribe(&mut self, topic: &str) {
        if !self.topics.iter().any(|t| t == topic) {
            self.topics.push(topic.to_string());
        }
        if self.link.is_none() {
            tracing::debug!(topic, "Not connected, subscription deferred until connect");
            return;
        }
        if self.subscriptions.contains_key(topic) {
            tracing::debug!(topic, "Already subscribed");
            return;
        }

        let transport = Arc::clone(&self.transport);
        let retry_delay = self.config.subscribe_retry_delay;
        let max_retries = self.config.subscribe_max_retries;
        let topic_owned = topic.to_string();
        let task = tokio::spawn(async move {
            let mut attempt = 0;
            loop {
                match transport.subscribe(&topic_owned).await {
                    Ok(()) => {
                        tracing::info!(topic = %topic_owned, "Subscribed");
                        return;
                    }
                    Err(e) if attempt < max_retries => {
                        attempt += 1;
                        tracing::warn!(topic = %topic_owned, attempt, error = %e, "Subscribe failed, retrying");
                        tokio::time::sleep(retry_delay).await;
                    }
                    Err(e) => {
                        tracing::error!(topic = %topic_owned, error = %e, "Subscribe failed, giving up");
                        return;
                    }
                }
            }
        });
        self.subscriptions.insert(topic.to_string(), task);
    }

    /// Sends now when connected, otherwise queues.
    pub async fn publish(&mut self, envelope: Envelope<OutboundMessage>) {
        if self.link.is_none() {
            tracing::debug!(
                kind = envelope.message.kind(),
                queued = self.queue.len() + 1,
                "Not connected, queueing outbound message"
            );
            self.queue.push(envelope);
            self.sync_queued();
            return;
        }

        if let Err(e) = self.send(&envelope).await {
            match e {
                TransportError::NotConnected => {
                    tracing::debug!(kind = envelope.message.kind(), "Link went away, queueing outbound message");
                    self.queue.push(envelope);
                    self.sync_queued();
                }
                other => {
                    tracing::warn!(kind = envelope.message.kind(), error = %other, "Publish failed, dropping message");
                }
            }
        }
    }

    async fn send(&self, envelope: &Envelope<OutboundMessage>) -> Result<(), TransportError> {
        let payload = match encode(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode outbound message");
                return Ok(());
            }
        };
        self.transport
            .publish(&self.config.publish_topic, payload)
            .await
    }

    async fn flush_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        tracing::info!(count = self.queue.len(), "Flushing queued messages");

        while let Some(envelope) = self.queue.pop() {
            match self.send(&envelope).await {
                Ok(()) => {}
                Err(TransportError::NotConnected) => {
                    tracing::warn!("Link lost during flush, keeping remaining messages queued");
                    self.queue.requeue(envelope);
                    break;
                }
                Err(e) => {
                    tracing::warn!(kind = envelope.message.kind(), error = %e, "Publish failed during flush, dropping message");
                }
            }
        }
        self.sync_queued();
    }

    /// Validates one inbound payload and forwards it.
    fn deliver(&self, topic: &str, payload: &str) {
        match decode_inbound(payload) {
            Ok(envelope) => {
                tracing::debug!(topic, kind = envelope.message.kind(), "Inbound message");
                if self.inbound.send(envelope).is_err() {
                    tracing::debug!("Inbound receiver dropped, discarding message");
                }
            }
            Err(e) if e.is_shape_error() => {
                tracing::debug!(topic, error = %e, "Dropping envelope with invalid shape");
            }
            Err(e) => {
                tracing::warn!(topic, error = %e, "Dropping malformed inbound message");
            }
        }
    }

    fn drop_link(&mut self) {
        self.link = None;
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
    }

    fn on_link_lost(&mut self, reason: &str) {
        tracing::warn!(reason, "Connection lost");
        self.drop_link();
        self.set_state(ConnectionState::Disconnected);
    }

    async fn handle_command(&mut self, command: Option<ChannelCommand>) -> Step {
        match command {
            Some(ChannelCommand::Publish(envelope)) => {
                self.publish(envelope).await;
                Step::Continue
            }
            Some(ChannelCommand::Shutdown) | None => Step::Shutdown,
        }
    }

    async fn serve_link(&mut self, commands: &mut mpsc::UnboundedReceiver<ChannelCommand>) -> Step {
        let wake = {
            let Some(link) = self.link.as_mut() else {
                return Step::Continue;
            };
            tokio::select! {
                command = commands.recv() => Wake::Command(command),
                event = link.recv() => Wake::Link(event),
            }
        };

        match wake {
            Wake::Command(command) => self.handle_command(command).await,
            Wake::Link(Some(TransportEvent::Message { topic, payload })) => {
                self.deliver(&topic, &payload);
                Step::Continue
            }
            Wake::Link(Some(TransportEvent::Closed { reason })) => {
                self.on_link_lost(&reason);
                Step::Continue
            }
            Wake::Link(None) => {
                self.on_link_lost("link dropped");
                Step::Continue
            }
        }
    }

    async fn wait_for_reconnect(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<ChannelCommand>,
    ) -> Step {
        if self.state() == ConnectionState::Failed {
            let command = commands.recv().await;
            return self.handle_command(command).await;
        }

        let Some(delay) = self.backoff.next_delay_and_advance() else {
            tracing::error!(
                attempts = self.backoff.attempts(),
                "Max reconnection attempts reached, giving up"
            );
            self.set_state(ConnectionState::Failed);
            return Step::Continue;
        };
        self.set_state(ConnectionState::Reconnecting);
        tracing::info!(
            "Reconnection attempt {} of {}, waiting {}ms",
            self.backoff.attempts(),
            self.backoff.max_attempts(),
            delay.as_millis()
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                command = commands.recv() => {
                    if self.handle_command(command).await == Step::Shutdown {
                        return Step::Shutdown;
                    }
                }
            }
        }

        match self.establish().await {
            Ok(()) => tracing::info!("Reconnected"),
            Err(e) => tracing::warn!(error = %e, "Reconnection attempt failed"),
        }
        Step::Continue
    }

    /// Drives the channel until shutdown.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ChannelCommand>) {
        if let Err(e) = self.connect().await {
            tracing::warn!(error = %e, "Initial connection failed, scheduling reconnect");
        }

        loop {
            let step = if self.link.is_some() {
                self.serve_link(&mut commands).await
            } else {
                self.wait_for_reconnect(&mut commands).await
            };
            if step == Step::Shutdown {
                break;
            }
        }

        self.drop_link();
        self.transport.disconnect().await;
        self.set_state(ConnectionState::Disconnected);
        if !self.queue.is_empty() {
            tracing::warn!(count = self.queue.len(), "Channel shut down with undelivered messages");
        }
        tracing::info!("Channel closed");
    }
}
