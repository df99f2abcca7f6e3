//! Headless adapters for running the presenter without a display or audio
//! output.
//!
//! The viewport tracks a scroll offset in fixed steps. The media backend and
//! minigame host refuse every load, which sends the media controller down its
//! simulated-playback path so chapter progression still works end to end.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use whiskers_domain::ResourceId;
use whiskers_protocol::Direction;

use crate::ports::outbound::{
    MediaBackend, MediaLoadError, MediaResource, MinigameHost, MinigameLink, MinigameLoadError,
    MinigameUnloadError, ScrollPosition, StoryViewport,
};

// =============================================================================
// Viewport
// =============================================================================

/// A story text region `max_offset` scroll steps tall.
pub struct HeadlessViewport {
    offset: Mutex<u32>,
    max_offset: u32,
}

impl HeadlessViewport {
    pub fn new(max_offset: u32) -> Self {
        Self {
            offset: Mutex::new(0),
            max_offset,
        }
    }

    pub fn offset(&self) -> u32 {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn position(&self, offset: u32) -> ScrollPosition {
        ScrollPosition {
            at_top: offset == 0,
            at_bottom: offset >= self.max_offset,
        }
    }
}

impl StoryViewport for HeadlessViewport {
    fn scroll(&self, direction: Direction) -> ScrollPosition {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset = match direction {
            Direction::Up => offset.saturating_sub(1),
            Direction::Down => (*offset + 1).min(self.max_offset),
        };
        self.position(*offset)
    }

    fn reset_to_top(&self) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) = 0;
    }
}

// =============================================================================
// Media
// =============================================================================

/// Media backend with no output device.
#[derive(Debug, Default)]
pub struct HeadlessMediaBackend;

#[async_trait]
impl MediaBackend for HeadlessMediaBackend {
    async fn open(&self, resource: &ResourceId) -> Result<Arc<dyn MediaResource>, MediaLoadError> {
        Err(MediaLoadError::Unavailable(format!(
            "no audio output for {resource}"
        )))
    }
}

/// Minigame host with no container to load bundles into.
#[derive(Debug, Default)]
pub struct HeadlessMinigameHost;

#[async_trait]
impl MinigameHost for HeadlessMinigameHost {
    async fn load(
        &self,
        resource: &ResourceId,
        _params: &Value,
    ) -> Result<MinigameLink, MinigameLoadError> {
        Err(MinigameLoadError::NotFound(resource.clone()))
    }

    fn unload_all(&self) -> Result<(), MinigameUnloadError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrolling_clamps_at_both_edges() {
        let viewport = HeadlessViewport::new(2);

        assert_eq!(
            viewport.scroll(Direction::Up),
            ScrollPosition {
                at_top: true,
                at_bottom: false
            }
        );
        viewport.scroll(Direction::Down);
        let bottom = viewport.scroll(Direction::Down);
        assert!(bottom.at_bottom);
        assert!(viewport.scroll(Direction::Down).at_bottom);
        assert_eq!(viewport.offset(), 2);

        viewport.reset_to_top();
        assert_eq!(viewport.offset(), 0);
    }

    #[test]
    fn zero_height_viewport_is_both_top_and_bottom() {
        let viewport = HeadlessViewport::new(0);
        let position = viewport.scroll(Direction::Down);
        assert!(position.at_top && position.at_bottom);
    }

    #[tokio::test]
    async fn headless_loads_are_refused() {
        let audio = HeadlessMediaBackend
            .open(&ResourceId::from("start_narration.mp3"))
            .await;
        assert!(matches!(audio, Err(MediaLoadError::Unavailable(_))));

        let game = HeadlessMinigameHost
            .load(&ResourceId::from("bubble_pop.html"), &Value::Null)
            .await;
        assert!(matches!(game, Err(MinigameLoadError::NotFound(_))));
        assert!(HeadlessMinigameHost.unload_all().is_ok());
    }
}
