//! Media sessions: narration audio and embedded minigames.

mod cache;
mod controller;
mod events;
mod session;

pub use cache::ResourceCache;
pub use controller::{MediaSessionController, MediaStats, MinigameRecord, PlaybackRecord};
pub use events::{MediaEvent, MediaStatus, SessionOutcome};
pub use session::{minigame_id_of, MediaSession, MediaSessionId, SessionState};
