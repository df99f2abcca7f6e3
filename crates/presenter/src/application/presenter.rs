//! Presenter actor
//!
//! One task owns the router and processes inbound messages, media events
//! and connection changes one at a time, each to completion.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use whiskers_protocol::{Envelope, InboundMessage};

use super::media::MediaEvent;
use super::router::MessageRouter;
use crate::infrastructure::messaging::{ConnectionState, ConnectionStateObserver};

pub struct Presenter {
    router: MessageRouter,
    inbound: mpsc::UnboundedReceiver<Envelope<InboundMessage>>,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    connection: ConnectionStateObserver,
}

impl Presenter {
    pub fn new(
        router: MessageRouter,
        inbound: mpsc::UnboundedReceiver<Envelope<InboundMessage>>,
        media_events: mpsc::UnboundedReceiver<MediaEvent>,
        connection: ConnectionStateObserver,
    ) -> Self {
        Self {
            router,
            inbound,
            media_events,
            connection,
        }
    }

    /// Runs until `shutdown` fires or the inbound channel closes, then stops
    /// media and shuts the channel down.
    pub async fn run(mut self, shutdown: CancellationToken) -> MessageRouter {
        info!(client_id = %self.connection.client_id(), "Presenter starting");
        let mut last_state = self.connection.state();
        self.router.on_connection_change(last_state);
        self.router.startup();

        let mut channel_open = true;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Presenter shutting down");
                    break;
                }
                status = self.connection.next_status(), if channel_open => match status {
                    Some(status) if status.state != last_state => {
                        last_state = status.state;
                        self.router.on_connection_change(status.state);
                    }
                    Some(_) => {}
                    None => channel_open = false,
                },
                message = self.inbound.recv() => match message {
                    Some(envelope) => self.router.route(envelope).await,
                    None => {
                        info!("Inbound channel closed");
                        break;
                    }
                },
                Some(event) = self.media_events.recv() => {
                    self.router.handle_media_event(event).await;
                }
            }
        }

        self.router.context().media().stop().await;
        self.router.on_connection_change(ConnectionState::Disconnected);
        self.router.context().publisher.shutdown();
        debug!("Presenter stopped");
        self.router
    }
}
