//! In-memory adapters for the presenter's ports.

mod capture;
mod fake_media;
mod fake_minigame;
mod fixtures;
mod memory_transport;

pub use capture::{capture_publisher, CapturedOutbound};
pub use fake_media::{FakeMediaBackend, FakeResource, MediaLog};
pub use fake_minigame::FakeMinigameHost;
pub use fixtures::{sample_story, InMemoryStory, InMemoryStoryFactory};
pub use memory_transport::MemoryTransport;
