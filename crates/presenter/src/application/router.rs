//! Message Router
//!
//! Maps each inbound message to a state transition plus side effects,
//! guarded by what the story is currently awaiting:
//!
//! | awaiting | message           | guard                          |
//! |----------|-------------------|--------------------------------|
//! | Proceed  | `proceed_chapter` | chapter has a `next`           |
//! | Choice   | `make_choice`     | index offered, target exists   |
//! | Choice   | `navigate_choice` | choices offered, not at edge   |
//! | any      | `minigame_input`  | a minigame is active           |
//! | any      | `reset_game`      |                                |
//! | any      | `status_request`  |                                |
//!
//! Anything failing its guard is logged and dropped.

use tracing::{debug, error, info, warn};
use whiskers_domain::{AwaitingInput, MediaActivity, MediaKind};
use whiskers_protocol::{Direction, Envelope, InboundMessage, OutboundMessage};

use super::context::{PresenterContext, ProgressionError};
use super::media::{minigame_id_of, MediaEvent, MediaStatus, SessionOutcome};
use super::reset::ResetCoordinator;
use crate::infrastructure::messaging::ConnectionState;

pub struct MessageRouter {
    ctx: PresenterContext,
    reset: ResetCoordinator,
}

impl MessageRouter {
    pub fn new(ctx: PresenterContext) -> Self {
        Self {
            ctx,
            reset: ResetCoordinator::new(),
        }
    }

    pub fn context(&self) -> &PresenterContext {
        &self.ctx
    }

    /// Announces the presenter and shows the start chapter.
    pub fn startup(&mut self) {
        self.ctx.publish_app_ready();
        let start = self.ctx.settings.start_chapter.clone();
        if let Err(e) = self.ctx.enter_chapter(&start) {
            warn!(chapter = %start, error = %e, "Could not show the start chapter");
        }
    }

    /// Handles one inbound message to completion.
    pub async fn route(&mut self, envelope: Envelope<InboundMessage>) {
        let kind = envelope.message.kind();
        debug!(kind, sent_at = %envelope.timestamp, "Routing inbound message");

        let outcome = match envelope.message {
            InboundMessage::ProceedChapter => self.handle_proceed(),
            InboundMessage::MakeChoice { choice_index } => self.handle_make_choice(choice_index),
            InboundMessage::NavigateChoice { direction } => self.handle_navigate(direction),
            InboundMessage::ScrollUp => {
                self.handle_scroll(Direction::Up);
                Ok(())
            }
            InboundMessage::ScrollDown => {
                self.handle_scroll(Direction::Down);
                Ok(())
            }
            InboundMessage::MinigameInput { input } => {
                self.handle_minigame_input(&input);
                Ok(())
            }
            InboundMessage::ResetGame => {
                self.reset_game().await;
                Ok(())
            }
            InboundMessage::StatusRequest => self.handle_status_request(),
            InboundMessage::Unknown => {
                debug!("Dropping message of unknown type");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            self.recover(kind, e).await;
        }
    }

    async fn recover(&mut self, kind: &'static str, error: ProgressionError) {
        match error {
            ProgressionError::Invariant(e) => {
                error!(kind, error = %e, "Game state invariant violated, resetting");
                self.reset_game().await;
            }
            ProgressionError::Content(e) => {
                warn!(kind, error = %e, "Story content unavailable for message");
            }
        }
    }

    async fn reset_game(&mut self) {
        let _ = self.reset.run(&mut self.ctx).await;
    }

    // =========================================================================
    // Story input
    // =========================================================================

    fn handle_proceed(&mut self) -> Result<(), ProgressionError> {
        let state = self.ctx.state();
        if state.awaiting_input() != AwaitingInput::Proceed {
            debug!(awaiting = ?state.awaiting_input(), "Dropping proceed_chapter");
            return Ok(());
        }
        let chapter = self.ctx.chapter(state.current_chapter())?;
        let Some(next) = chapter.next else {
            debug!(chapter = %chapter.id, "Chapter has nowhere to proceed to");
            return Ok(());
        };
        self.ctx.enter_chapter(&next)
    }

    fn handle_make_choice(&mut self, index: usize) -> Result<(), ProgressionError> {
        let state = self.ctx.state();
        if state.awaiting_input() != AwaitingInput::Choice {
            info!(
                choice_index = index,
                awaiting = ?state.awaiting_input(),
                "Dropping make_choice, no choice is pending"
            );
            return Ok(());
        }
        let Some(offered) = state.choices().get(index) else {
            warn!(
                choice_index = index,
                offered = state.choices().len(),
                "Dropping make_choice, index out of range"
            );
            return Ok(());
        };
        if let Err(e) = self.ctx.chapter(&offered.next_chapter) {
            warn!(choice_index = index, error = %e, "Dropping make_choice, target chapter missing");
            return Ok(());
        }
        let ignored = state.attributes().unrecognized(&offered.effects);
        if !ignored.is_empty() {
            debug!(?ignored, "Ignoring unrecognized choice effects");
        }

        let at = self.ctx.publisher.now();
        let Some((next, choice)) = state.commit_choice(index, at) else {
            return Ok(());
        };
        self.ctx.store.commit(next)?;
        info!(
            chapter = %state.current_chapter(),
            choice_index = index,
            choice = %choice.text,
            "Choice made"
        );
        self.ctx.publisher.publish_at(
            OutboundMessage::ChoiceMade {
                chapter: state.current_chapter().clone(),
                choice_index: index,
                choice_text: choice.text.clone(),
                next_chapter: choice.next_chapter.clone(),
            },
            at,
        );
        self.ctx.enter_chapter(&choice.next_chapter)
    }

    fn handle_navigate(&mut self, direction: Direction) -> Result<(), ProgressionError> {
        let state = self.ctx.state();
        if state.awaiting_input() != AwaitingInput::Choice {
            debug!(?direction, "Dropping navigate_choice, no choice is pending");
            return Ok(());
        }
        let Some(next) = state.navigate(direction) else {
            debug!(?direction, selected = state.selected_index(), "Selection already at the edge");
            return Ok(());
        };
        let selected = next.selected_index();
        let text = next
            .selected_choice()
            .map(|c| c.text.clone())
            .unwrap_or_default();
        self.ctx.store.commit(next)?;
        self.ctx.publish(OutboundMessage::ChoiceSelected {
            choice_index: selected,
            choice_text: text,
        });
        Ok(())
    }

    fn handle_scroll(&mut self, direction: Direction) {
        let position = self.ctx.viewport.scroll(direction);
        self.ctx.publish(OutboundMessage::ScrollStatus {
            direction,
            at_top: position.at_top,
            at_bottom: position.at_bottom,
        });
    }

    fn handle_minigame_input(&mut self, input: &str) {
        if self.ctx.state().media_active() != MediaActivity::Minigame {
            debug!(input, "Dropping minigame_input, no minigame is active");
            return;
        }
        if !self.ctx.media.forward_input(input) {
            debug!(input, "Minigame went away before input arrived");
        }
    }

    fn handle_status_request(&mut self) -> Result<(), ProgressionError> {
        self.ctx.announce_current()?;
        Ok(())
    }

    // =========================================================================
    // Media
    // =========================================================================

    /// Applies a media session notification.
    pub fn on_media_event(&mut self, event: MediaEvent) -> Result<(), ProgressionError> {
        match event {
            MediaEvent::Status {
                resource,
                status,
                result,
                ..
            } => {
                let message = match status {
                    MediaStatus::Audio(status) => OutboundMessage::AudioStatus {
                        status,
                        audio_file: Some(resource),
                    },
                    MediaStatus::Minigame(status) => OutboundMessage::MinigameStatus {
                        status,
                        minigame_id: Some(minigame_id_of(&resource)),
                        result,
                    },
                };
                self.ctx.publish(message);
                Ok(())
            }
            MediaEvent::Activated { session, kind } => {
                if !self.ctx.media.is_current(session) {
                    debug!(%session, "Ignoring activation of a superseded session");
                    return Ok(());
                }
                self.ctx
                    .store
                    .update(|s| Some(s.with_media(MediaActivity::from(kind))))?;
                Ok(())
            }
            MediaEvent::Ended {
                session,
                kind,
                outcome,
            } => {
                if !self.ctx.media.is_current(session) {
                    debug!(%session, "Ignoring end of a superseded session");
                    return Ok(());
                }
                self.ctx
                    .store
                    .update(|s| Some(s.with_media(MediaActivity::None)))?;
                if kind == MediaKind::Minigame {
                    self.continue_after_minigame(&outcome)?;
                }
                Ok(())
            }
        }
    }

    /// Like [`on_media_event`](Self::on_media_event), resetting on invariant failures.
    pub async fn handle_media_event(&mut self, event: MediaEvent) {
        if let Err(e) = self.on_media_event(event) {
            self.recover("media_event", e).await;
        }
    }

    fn continue_after_minigame(&mut self, outcome: &SessionOutcome) -> Result<(), ProgressionError> {
        let chapter = self.ctx.chapter(self.ctx.state().current_chapter())?;
        let Some(stage) = chapter.minigame.as_ref() else {
            warn!(chapter = %chapter.id, "Minigame ended outside a minigame chapter");
            return Ok(());
        };
        let next = stage.next_chapter(outcome.succeeded()).clone();
        info!(
            chapter = %chapter.id,
            succeeded = outcome.succeeded(),
            next = %next,
            "Continuing story after minigame"
        );
        self.ctx.enter_chapter(&next)
    }

    // =========================================================================
    // Connection
    // =========================================================================

    pub fn on_connection_change(&mut self, state: ConnectionState) {
        let connected = state.is_connected();
        let changed = self
            .ctx
            .store
            .update(|s| (s.connected() != connected).then(|| s.with_connected(connected)));
        if matches!(changed, Ok(true)) {
            info!(%state, "Connection state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::{json, Value};
    use whiskers_domain::{ChapterId, ResourceId};

    use super::*;
    use crate::application::context::PresenterSettings;
    use crate::application::media::MediaSessionController;
    use crate::config::MediaConfig;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::infrastructure::headless::HeadlessViewport;
    use crate::infrastructure::testing::{
        capture_publisher, CapturedOutbound, FakeMediaBackend, FakeMinigameHost, InMemoryStory,
        InMemoryStoryFactory,
    };
    use crate::ports::outbound::{MockStoryContent, StoryContent};
    use whiskers_protocol::FeaturesEnabled;

    fn settings() -> PresenterSettings {
        PresenterSettings {
            start_chapter: ChapterId::from("start"),
            development_mode: true,
            features: FeaturesEnabled {
                audio: false,
                minigames: true,
                story_engine: true,
            },
            reset_settle: Duration::from_millis(1),
        }
    }

    fn media_config() -> MediaConfig {
        MediaConfig {
            stop_settle: Duration::from_millis(1),
            placeholder_audio: Duration::from_secs(60),
            ..MediaConfig::default()
        }
    }

    fn router_with(content: Arc<dyn StoryContent>) -> (MessageRouter, CapturedOutbound) {
        let (router, outbound, _events) = router_with_media_events(content);
        (router, outbound)
    }

    fn router_with_media_events(
        content: Arc<dyn StoryContent>,
    ) -> (
        MessageRouter,
        CapturedOutbound,
        tokio::sync::mpsc::UnboundedReceiver<MediaEvent>,
    ) {
        let clock = Arc::new(FixedClock(Utc::now()));
        let (media, events) = MediaSessionController::new(
            Arc::new(FakeMediaBackend::new()),
            Arc::new(FakeMinigameHost::new()),
            clock.clone(),
            Arc::new(FixedRandom(1)),
            media_config(),
        );
        let (publisher, outbound) = capture_publisher(clock);
        let ctx = PresenterContext::new(
            content,
            InMemoryStoryFactory::new(),
            media,
            publisher,
            Arc::new(HeadlessViewport::new(3)),
            settings(),
        );
        (MessageRouter::new(ctx), outbound, events)
    }

    fn envelope(message: InboundMessage) -> Envelope<InboundMessage> {
        Envelope::new(message, Utc::now())
    }

    async fn router_in_hall() -> (MessageRouter, CapturedOutbound) {
        let (mut router, mut outbound) = router_with(InMemoryStory::sample());
        router.startup();
        router.route(envelope(InboundMessage::ProceedChapter)).await;
        assert_eq!(router.context().state().current_chapter().as_str(), "hall");
        outbound.drain();
        (router, outbound)
    }

    #[tokio::test]
    async fn startup_announces_then_shows_start() {
        let (mut router, mut outbound) = router_with(InMemoryStory::sample());
        router.startup();
        assert_eq!(
            outbound.drain_kinds(),
            vec!["app_ready", "chapter_changed", "ready_for_input"]
        );
        assert_eq!(
            router.context().state().awaiting_input(),
            AwaitingInput::Proceed
        );
    }

    #[tokio::test]
    async fn proceed_enters_next_chapter_and_offers_choices() {
        let (router, _) = router_in_hall().await;
        let state = router.context().state();
        assert_eq!(state.awaiting_input(), AwaitingInput::Choice);
        assert_eq!(state.choices().len(), 2);
    }

    #[tokio::test]
    async fn make_choice_commits_and_publishes_choice_made() {
        let (mut router, mut outbound) = router_in_hall().await;

        router
            .route(envelope(InboundMessage::MakeChoice { choice_index: 1 }))
            .await;

        let published = outbound.drain();
        assert!(matches!(
            &published[0],
            OutboundMessage::ChoiceMade { choice_index: 1, choice_text, next_chapter, .. }
                if choice_text == "Sneak into the cellar" && next_chapter.as_str() == "cellar"
        ));
        assert_eq!(published[1].kind(), "chapter_changed");
        let state = router.context().state();
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.current_chapter().as_str(), "cellar");
    }

    #[tokio::test]
    async fn make_choice_is_ignored_unless_a_choice_is_pending() {
        let (mut router, mut outbound) = router_with(InMemoryStory::sample());
        router.startup();
        outbound.drain();
        let before = router.context().state();

        router
            .route(envelope(InboundMessage::MakeChoice { choice_index: 0 }))
            .await;

        assert!(outbound.drain().is_empty());
        assert_eq!(router.context().state(), before);
    }

    #[tokio::test]
    async fn out_of_range_choice_is_dropped() {
        let (mut router, mut outbound) = router_in_hall().await;
        let before = router.context().state();
        router
            .route(envelope(InboundMessage::MakeChoice { choice_index: 7 }))
            .await;
        assert!(outbound.drain().is_empty());
        assert_eq!(router.context().state(), before);
    }

    #[tokio::test]
    async fn choice_with_missing_target_is_dropped() {
        let mut content = MockStoryContent::new();
        content.expect_chapter().returning(|id| {
            InMemoryStory::sample().chapter(id).and_then(|chapter| {
                if chapter.id.as_str() == "cellar" {
                    Err(crate::ports::outbound::ContentError::ChapterNotFound(chapter.id))
                } else {
                    Ok(chapter)
                }
            })
        });
        let (mut router, mut outbound) = router_with(Arc::new(content));
        router.startup();
        router.route(envelope(InboundMessage::ProceedChapter)).await;
        outbound.drain();
        let before = router.context().state();

        router
            .route(envelope(InboundMessage::MakeChoice { choice_index: 1 }))
            .await;

        assert!(outbound.drain().is_empty());
        assert_eq!(router.context().state(), before);
    }

    #[tokio::test]
    async fn navigate_moves_within_bounds_only() {
        let (mut router, mut outbound) = router_in_hall().await;

        router
            .route(envelope(InboundMessage::NavigateChoice {
                direction: Direction::Up,
            }))
            .await;
        assert!(outbound.drain().is_empty());
        assert_eq!(router.context().state().selected_index(), 0);

        for _ in 0..3 {
            router
                .route(envelope(InboundMessage::NavigateChoice {
                    direction: Direction::Down,
                }))
                .await;
        }
        assert_eq!(router.context().state().selected_index(), 1);
        assert_eq!(
            outbound.drain(),
            vec![OutboundMessage::ChoiceSelected {
                choice_index: 1,
                choice_text: "Sneak into the cellar".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn scroll_reports_viewport_position() {
        let (mut router, mut outbound) = router_with(InMemoryStory::sample());
        router.route(envelope(InboundMessage::ScrollDown)).await;
        router.route(envelope(InboundMessage::ScrollUp)).await;
        assert_eq!(
            outbound.drain(),
            vec![
                OutboundMessage::ScrollStatus {
                    direction: Direction::Down,
                    at_top: false,
                    at_bottom: false,
                },
                OutboundMessage::ScrollStatus {
                    direction: Direction::Up,
                    at_top: true,
                    at_bottom: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn minigame_input_requires_an_active_minigame() {
        let (mut router, mut outbound) = router_in_hall().await;
        router
            .route(envelope(InboundMessage::MinigameInput {
                input: "jump".to_string(),
            }))
            .await;
        assert!(outbound.drain().is_empty());
    }

    #[tokio::test]
    async fn status_request_republishes_snapshot() {
        let (mut router, mut outbound) = router_in_hall().await;
        router.route(envelope(InboundMessage::StatusRequest)).await;

        let published = outbound.drain();
        assert_eq!(
            published.iter().map(OutboundMessage::kind).collect::<Vec<_>>(),
            vec!["chapter_changed", "choices_available", "ready_for_input"]
        );
        assert!(matches!(
            &published[2],
            OutboundMessage::ReadyForInput { awaiting_input_type: AwaitingInput::Choice, .. }
        ));
    }

    #[tokio::test]
    async fn unknown_messages_are_dropped() {
        let (mut router, mut outbound) = router_in_hall().await;
        let before = router.context().state();
        router.route(envelope(InboundMessage::Unknown)).await;
        assert!(outbound.drain().is_empty());
        assert_eq!(router.context().state(), before);
    }

    #[tokio::test]
    async fn media_status_is_published_even_for_stopped_sessions() {
        let (mut router, mut outbound) = router_with(InMemoryStory::sample());
        router
            .on_media_event(MediaEvent::Status {
                session: crate::application::media::MediaSessionId::new(99),
                resource: ResourceId::from("bubble_pop.html"),
                status: MediaStatus::Minigame(whiskers_protocol::MinigameStatus::Progress),
                result: Some(json!({"score": 3})),
            })
            .expect("status");
        assert_eq!(
            outbound.drain(),
            vec![OutboundMessage::MinigameStatus {
                status: whiskers_protocol::MinigameStatus::Progress,
                minigame_id: Some(whiskers_domain::MinigameId::from("bubble_pop")),
                result: Some(json!({"score": 3})),
            }]
        );
    }

    #[tokio::test]
    async fn superseded_session_events_are_ignored() {
        let (mut router, _) = router_with(InMemoryStory::sample());
        let stale = crate::application::media::MediaSessionId::new(12345);
        router
            .on_media_event(MediaEvent::Activated {
                session: stale,
                kind: MediaKind::Minigame,
            })
            .expect("ignored");
        assert_eq!(router.context().state().media_active(), MediaActivity::None);

        router
            .on_media_event(MediaEvent::Ended {
                session: stale,
                kind: MediaKind::Minigame,
                outcome: SessionOutcome::MinigameCompleted(Value::Null),
            })
            .expect("ignored");
        assert_eq!(router.context().state().current_chapter().as_str(), "start");
    }

    #[tokio::test]
    async fn queued_events_of_a_replaced_session_do_not_touch_state() {
        let (mut router, _, mut events) = router_with_media_events(InMemoryStory::sample());
        let media = Arc::clone(router.context().media());
        media
            .start(MediaKind::Audio, ResourceId::from("x.mp3"), Value::Null)
            .await;
        let mut queued = Vec::new();
        while let Ok(event) = events.try_recv() {
            queued.push(event);
        }
        let replaced = queued
            .iter()
            .find_map(|e| match e {
                MediaEvent::Activated { session, .. } => Some(*session),
                _ => None,
            })
            .expect("x activated");

        // y is requested but still settling when x's events are handled
        let starting = media.start_detached(MediaKind::Audio, ResourceId::from("y.mp3"), Value::Null);
        for event in queued {
            router.on_media_event(event).expect("handled");
        }
        router
            .on_media_event(MediaEvent::Ended {
                session: replaced,
                kind: MediaKind::Audio,
                outcome: SessionOutcome::Finished,
            })
            .expect("handled");
        assert_eq!(router.context().state().media_active(), MediaActivity::None);

        starting.await.expect("start task");
        while let Ok(event) = events.try_recv() {
            router.on_media_event(event).expect("handled");
        }
        assert_eq!(router.context().state().media_active(), MediaActivity::Audio);
    }

    #[tokio::test]
    async fn connection_changes_update_state() {
        let (mut router, _) = router_with(InMemoryStory::sample());
        router.on_connection_change(ConnectionState::Connected);
        assert!(router.context().state().connected());
        router.on_connection_change(ConnectionState::Reconnecting);
        assert!(!router.context().state().connected());
    }
}
