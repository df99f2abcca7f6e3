//! Outbound ports - Interfaces for external collaborators
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing the presenter core to drive transports, media playback, minigames and
//! story content without depending on concrete implementations.

pub mod clock_port;
pub mod media_port;
pub mod minigame_port;
pub mod story_content_port;
pub mod transport_port;
pub mod viewport_port;

pub use clock_port::{ClockPort, RandomPort};
pub use media_port::{MediaBackend, MediaLoadError, MediaResource, PlaybackError};
pub use minigame_port::{
    MinigameCommand, MinigameHost, MinigameInstance, MinigameLink, MinigameLoadError,
    MinigameSignal, MinigameUnloadError,
};
pub use story_content_port::{ContentError, StoryContent, StoryContentFactory};
pub use transport_port::{PubSubTransport, TransportError, TransportEvent};
pub use viewport_port::{ScrollPosition, StoryViewport};

#[cfg(test)]
pub use clock_port::{MockClockPort, MockRandomPort};
#[cfg(test)]
pub use story_content_port::{MockStoryContent, MockStoryContentFactory};
