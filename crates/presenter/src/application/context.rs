//! Collaborators shared by the message router and the reset coordinator.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use whiskers_domain::{Chapter, ChapterId, ChapterKind, MediaActivity, MediaKind, ResourceId};
use whiskers_protocol::{FeaturesEnabled, InputContext, OutboundMessage};

use super::media::MediaSessionController;
use crate::config::PresenterConfig;
use crate::infrastructure::messaging::ChannelPublisher;
use crate::ports::outbound::{ContentError, StoryContent, StoryContentFactory, StoryViewport};
use crate::state::{GameState, StateInvariantError, StateStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressionError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Invariant(#[from] StateInvariantError),
}

/// Presenter behaviour switches taken from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenterSettings {
    pub start_chapter: ChapterId,
    pub development_mode: bool,
    pub features: FeaturesEnabled,
    /// Pause between `game_reset` and the fresh snapshot.
    pub reset_settle: Duration,
}

impl PresenterSettings {
    pub fn from_config(config: &PresenterConfig) -> Self {
        Self {
            start_chapter: config.start_chapter.clone(),
            development_mode: config.development_mode,
            features: config.features(),
            reset_settle: config.reset_settle,
        }
    }
}

pub struct PresenterContext {
    pub(crate) store: StateStore,
    pub(crate) content: Arc<dyn StoryContent>,
    pub(crate) factory: Arc<dyn StoryContentFactory>,
    pub(crate) media: Arc<MediaSessionController>,
    pub(crate) publisher: ChannelPublisher,
    pub(crate) viewport: Arc<dyn StoryViewport>,
    pub(crate) settings: PresenterSettings,
}

impl PresenterContext {
    pub fn new(
        content: Arc<dyn StoryContent>,
        factory: Arc<dyn StoryContentFactory>,
        media: Arc<MediaSessionController>,
        publisher: ChannelPublisher,
        viewport: Arc<dyn StoryViewport>,
        settings: PresenterSettings,
    ) -> Self {
        Self {
            store: StateStore::new(settings.start_chapter.clone()),
            content,
            factory,
            media,
            publisher,
            viewport,
            settings,
        }
    }

    pub fn state(&self) -> GameState {
        self.store.snapshot()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn media(&self) -> &Arc<MediaSessionController> {
        &self.media
    }

    pub fn publish(&self, message: OutboundMessage) {
        self.publisher.publish(message);
    }

    pub fn publish_app_ready(&self) {
        self.publish(OutboundMessage::AppReady {
            development_mode: self.settings.development_mode,
            features_enabled: self.settings.features,
        });
    }

    /// Shows `id`: updates state, announces it and starts its media.
    pub fn enter_chapter(&self, id: &ChapterId) -> Result<(), ProgressionError> {
        let chapter = self.content.chapter(id)?;
        self.show_chapter(&chapter)?;
        self.start_media(&chapter);
        Ok(())
    }

    /// Updates state and announces `chapter` without touching media.
    pub fn show_chapter(&self, chapter: &Chapter) -> Result<(), ProgressionError> {
        let next = self
            .state()
            .enter_chapter(chapter)
            .with_media(MediaActivity::None);
        self.store.commit(next)?;
        self.viewport.reset_to_top();
        info!(chapter = %chapter.id, title = %chapter.title, "Entered chapter");
        self.announce(chapter);
        Ok(())
    }

    /// Publishes the chapter/choices/awaiting-input snapshot for `chapter`.
    pub fn announce(&self, chapter: &Chapter) {
        let state = self.state();
        self.publish(OutboundMessage::ChapterChanged {
            current_chapter: chapter.id.clone(),
            chapter_title: chapter.title.clone(),
            chapter_type: chapter.kind,
            player_state: state.attributes().clone(),
        });
        if !state.choices().is_empty() {
            self.publish(OutboundMessage::ChoicesAvailable {
                chapter: chapter.id.clone(),
                choices: state.choices().to_vec(),
                current_selection: state.selected_index(),
            });
        }
        let context = if chapter.kind == ChapterKind::Minigame {
            InputContext::Minigame
        } else {
            InputContext::Story
        };
        self.publish(OutboundMessage::ReadyForInput {
            context,
            awaiting_input_type: state.awaiting_input(),
        });
    }

    /// Republishes the snapshot for the current chapter.
    pub fn announce_current(&self) -> Result<(), ContentError> {
        let chapter = self.content.chapter(self.state().current_chapter())?;
        self.announce(&chapter);
        Ok(())
    }

    /// Starts the chapter's minigame or narration, or stops media when it has neither.
    pub fn start_media(&self, chapter: &Chapter) {
        if let Some(stage) = &chapter.minigame {
            let resource = ResourceId::minigame(&stage.id);
            debug!(chapter = %chapter.id, %resource, "Starting chapter minigame");
            self.media
                .start_detached(MediaKind::Minigame, resource, stage.params.clone());
        } else if let Some(resource) = chapter.narration_resource() {
            debug!(chapter = %chapter.id, %resource, "Starting chapter narration");
            self.media
                .start_detached(MediaKind::Audio, resource, serde_json::Value::Null);
        } else {
            self.media.stop_detached();
        }
    }

    pub fn chapter(&self, id: &ChapterId) -> Result<Chapter, ContentError> {
        self.content.chapter(id)
    }
}
