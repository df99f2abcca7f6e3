//! Story Content Port - read-only chapter store

use std::sync::Arc;

use thiserror::Error;
use whiskers_domain::{Chapter, ChapterId, DomainError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("Chapter not found: {0}")]
    ChapterNotFound(ChapterId),

    #[error("Story content unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid story content: {0}")]
    Invalid(#[from] DomainError),
}

#[cfg_attr(test, mockall::automock)]
pub trait StoryContent: Send + Sync {
    fn chapter(&self, id: &ChapterId) -> Result<Chapter, ContentError>;

    /// Return the content store to its freshly loaded condition.
    fn reset(&self) -> Result<(), ContentError>;
}

/// Builds a content store from scratch when resetting one fails.
#[cfg_attr(test, mockall::automock)]
pub trait StoryContentFactory: Send + Sync {
    fn build(&self) -> Result<Arc<dyn StoryContent>, ContentError>;
}
