//! Minigame Port - hosting of embedded minigame bundles

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use whiskers_domain::ResourceId;

/// Messages sent into a running minigame.
#[derive(Debug, Clone, PartialEq)]
pub enum MinigameCommand {
    Initialize { game_data: Value },
    Input { input: String },
}

/// Messages a running minigame sends back.
#[derive(Debug, Clone, PartialEq)]
pub enum MinigameSignal {
    Progress(Value),
    Completed(Value),
    Failed(Value),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MinigameLoadError {
    #[error("Minigame bundle not found: {0}")]
    NotFound(ResourceId),

    #[error("Minigame did not load within {0:?}")]
    TimedOut(Duration),

    #[error("Minigame crashed while loading: {0}")]
    Crashed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to unload minigame: {0}")]
pub struct MinigameUnloadError(pub String);

pub trait MinigameInstance: Send + Sync {
    fn send(&self, command: MinigameCommand);

    /// Tear the instance down; no signals are delivered afterwards.
    fn unload(&self);
}

/// A loaded minigame and the stream of signals it produces.
pub struct MinigameLink {
    pub instance: Arc<dyn MinigameInstance>,
    pub signals: mpsc::UnboundedReceiver<MinigameSignal>,
}

#[async_trait]
pub trait MinigameHost: Send + Sync {
    /// Resolves once the bundle signals that it has loaded.
    async fn load(&self, resource: &ResourceId, params: &Value)
        -> Result<MinigameLink, MinigameLoadError>;

    /// Clear the host container, whatever it holds.
    fn unload_all(&self) -> Result<(), MinigameUnloadError>;
}
