//! Story content loaded from disk.

mod json_story;

pub use json_story::{JsonStoryContent, JsonStoryFactory, StoryDocument};
