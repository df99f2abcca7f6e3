//! Harness that runs a complete presenter against the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use whiskers_domain::ChapterId;
use whiskers_protocol::FeaturesEnabled;

use crate::application::media::MediaSessionController;
use crate::application::{MessageRouter, Presenter, PresenterContext, PresenterSettings};
use crate::config::{BackoffConfig, ChannelConfig, MediaConfig};
use crate::infrastructure::clock::{FixedClock, FixedRandom};
use crate::infrastructure::headless::HeadlessViewport;
use crate::infrastructure::messaging::{create_channel, ConnectionState, ConnectionStateObserver};
use crate::infrastructure::testing::{
    FakeMediaBackend, FakeMinigameHost, InMemoryStory, InMemoryStoryFactory, MemoryTransport,
};
use crate::state::GameState;

pub const PRIMARY: &str = "ws://primary.test:8083/mqtt";
pub const FALLBACK: &str = "ws://fallback.test:8084/mqtt";

/// Upper bound for anything a scenario waits on.
pub const WITHIN: Duration = Duration::from_secs(3);

pub fn channel_config() -> ChannelConfig {
    ChannelConfig {
        primary_url: PRIMARY.to_string(),
        fallback_url: Some(FALLBACK.to_string()),
        connect_timeout: Duration::from_millis(50),
        backoff: BackoffConfig {
            initial_delay: Duration::from_millis(10),
            multiplier: 1.5,
            max_delay: Duration::from_millis(20),
            max_attempts: 100,
        },
        subscribe_retry_delay: Duration::from_millis(5),
        subscribe_max_retries: 3,
        ..ChannelConfig::default()
    }
}

/// Narration is simulated and never ends on its own during a scenario.
pub fn media_config() -> MediaConfig {
    MediaConfig {
        audio_enabled: false,
        minigames_enabled: true,
        stop_settle: Duration::from_millis(1),
        placeholder_audio: Duration::from_secs(60),
        placeholder_minigame: Duration::from_secs(60),
        minigame_load_timeout: Duration::from_secs(1),
        minigame_return_delay: Duration::from_millis(5),
        ..MediaConfig::default()
    }
}

/// A running presenter plus handles on every adapter it talks to.
pub struct E2EPresenter {
    pub transport: MemoryTransport,
    pub host: FakeMinigameHost,
    pub story: Arc<InMemoryStory>,
    state: watch::Receiver<GameState>,
    observer: ConnectionStateObserver,
    shutdown: CancellationToken,
    presenter: JoinHandle<MessageRouter>,
    channel: JoinHandle<()>,
}

impl E2EPresenter {
    /// Starts the presenter and waits until it is subscribed and has shown
    /// the start chapter.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Like [`start`](Self::start), letting the test shape the broker before
    /// the presenter first connects.
    pub async fn start_with(prepare: impl FnOnce(&MemoryTransport)) -> Self {
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
                .single()
                .expect("valid time"),
        ));
        let transport = MemoryTransport::new();
        prepare(&transport);
        let host = FakeMinigameHost::new();
        let story = InMemoryStory::sample();

        let channel = create_channel(
            Arc::new(transport.clone()),
            channel_config(),
            "CatStory_Presenter_e2e".to_string(),
            clock.clone(),
        );
        let (media, media_events) = MediaSessionController::new(
            Arc::new(FakeMediaBackend::new()),
            Arc::new(host.clone()),
            clock,
            Arc::new(FixedRandom(1)),
            media_config(),
        );
        let ctx = PresenterContext::new(
            story.clone(),
            InMemoryStoryFactory::new(),
            media,
            channel.publisher,
            Arc::new(HeadlessViewport::new(4)),
            PresenterSettings {
                start_chapter: ChapterId::from("start"),
                development_mode: true,
                features: FeaturesEnabled {
                    audio: false,
                    minigames: true,
                    story_engine: true,
                },
                reset_settle: Duration::from_millis(1),
            },
        );
        let state = ctx.store().subscribe();
        let observer = channel.state_observer.clone();
        let shutdown = CancellationToken::new();
        let presenter = Presenter::new(
            MessageRouter::new(ctx),
            channel.inbound,
            media_events,
            channel.state_observer,
        );
        let presenter = tokio::spawn(presenter.run(shutdown.clone()));

        let mut harness = Self {
            transport,
            host,
            story,
            state,
            observer,
            shutdown,
            presenter,
            channel: channel.task,
        };
        harness
            .transport
            .wait_for_subscriptions(1, WITHIN)
            .await
            .expect("subscribed");
        harness.wait_for_published("ready_for_input", 1).await;
        harness.wait_for_state(|s| s.connected()).await;
        harness
    }

    /// Publishes `message` (a JSON object with its `type`) as the orchestrator.
    pub fn send(&self, message: Value) {
        let mut envelope = message;
        envelope["timestamp"] = json!("2024-01-15T10:31:00.000Z");
        assert!(
            self.transport.inject(&envelope.to_string()),
            "broker has no open link"
        );
    }

    pub fn send_type(&self, kind: &str) {
        self.send(json!({ "type": kind }));
    }

    /// Every published envelope, parsed.
    pub fn published(&self) -> Vec<Value> {
        self.transport
            .published()
            .iter()
            .map(|payload| serde_json::from_str(payload).expect("published JSON"))
            .collect()
    }

    pub fn published_of(&self, kind: &str) -> Vec<Value> {
        self.published()
            .into_iter()
            .filter(|value| value["type"] == kind)
            .collect()
    }

    /// Waits until at least `count` envelopes of `kind` have been published.
    pub async fn wait_for_published(&self, kind: &str, count: usize) -> Vec<Value> {
        tokio::time::timeout(WITHIN, async {
            loop {
                let matching = self.published_of(kind);
                if matching.len() >= count {
                    return matching;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{count} x {kind} not published; got {:?}", self.transport.published_types()))
    }

    pub fn state(&self) -> GameState {
        self.state.borrow().clone()
    }

    pub async fn wait_for_state(&mut self, predicate: impl FnMut(&GameState) -> bool) -> GameState {
        tokio::time::timeout(WITHIN, self.state.wait_for(predicate))
            .await
            .expect("state reached in time")
            .expect("store alive")
            .clone()
    }

    pub async fn wait_for_connection(&mut self, state: ConnectionState) {
        tokio::time::timeout(WITHIN, self.observer.wait_for(state))
            .await
            .expect("connection state reached in time");
    }

    /// Moves from the start chapter into the hall, where two choices wait.
    pub async fn proceed_to_hall(&mut self) {
        self.send_type("proceed_chapter");
        self.wait_for_state(|s| s.current_chapter().as_str() == "hall")
            .await;
        self.wait_for_published("choices_available", 1).await;
    }

    pub async fn stop(self) -> MessageRouter {
        self.shutdown.cancel();
        let router = tokio::time::timeout(WITHIN, self.presenter)
            .await
            .expect("presenter stopped in time")
            .expect("presenter task");
        tokio::time::timeout(WITHIN, self.channel)
            .await
            .expect("channel stopped in time")
            .expect("channel task");
        router
    }
}
