//! Viewport Port - the scrollable story text region

use whiskers_protocol::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollPosition {
    pub at_top: bool,
    pub at_bottom: bool,
}

pub trait StoryViewport: Send + Sync {
    fn scroll(&self, direction: Direction) -> ScrollPosition;

    /// Called whenever a new chapter is shown.
    fn reset_to_top(&self);
}
