//! Media Port - audio playback primitives
//!
//! Decoding and output are external; the media session controller only needs
//! to start, pause and observe a resource.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use whiskers_domain::ResourceId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Output refused to start without user interaction. Expected, not a failure.
    #[error("Autoplay blocked until user interaction")]
    AutoplayBlocked,

    #[error("Playback failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaLoadError {
    #[error("Media resource not found: {0}")]
    NotFound(ResourceId),

    #[error("Media resource corrupt: {0}")]
    Corrupt(ResourceId),

    #[error("Media backend unavailable: {0}")]
    Unavailable(String),
}

/// One playable resource. Implementations use interior mutability; every
/// method may be called from any task.
#[async_trait]
pub trait MediaResource: Send + Sync {
    fn id(&self) -> &ResourceId;

    /// Resolves once playback has actually started.
    async fn play(&self) -> Result<(), PlaybackError>;

    fn pause(&self);

    /// Seek back to the beginning.
    fn rewind(&self);

    /// Drop the underlying source. The resource is unusable afterwards.
    fn release(&self);

    fn set_volume(&self, volume: f32);

    fn is_playing(&self) -> bool;

    /// Lost its source or hit a decode/network error.
    fn is_corrupted(&self) -> bool;

    /// Resolves when playback reaches the end.
    async fn ended(&self);
}

#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn open(&self, resource: &ResourceId) -> Result<Arc<dyn MediaResource>, MediaLoadError>;
}
