//! Notifications from the media session controller to the presenter.

use serde_json::Value;
use whiskers_domain::{MediaKind, ResourceId};
use whiskers_protocol::{AudioStatus, MinigameStatus};

use super::session::MediaSessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Audio(AudioStatus),
    Minigame(MinigameStatus),
}

/// How a session ended on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Narration played to the end
    Finished,
    MinigameCompleted(Value),
    MinigameFailed(Value),
}

impl SessionOutcome {
    /// Completed minigames may still report `success: false`.
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Finished => true,
            Self::MinigameCompleted(result) => result.get("success") != Some(&Value::Bool(false)),
            Self::MinigameFailed(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Informational status, published as `audio_status` / `minigame_status`
    Status {
        session: MediaSessionId,
        resource: ResourceId,
        status: MediaStatus,
        result: Option<Value>,
    },
    /// Session reached Active
    Activated {
        session: MediaSessionId,
        kind: MediaKind,
    },
    /// Session ended without being stopped
    Ended {
        session: MediaSessionId,
        kind: MediaKind,
        outcome: SessionOutcome,
    },
}

impl MediaEvent {
    pub fn session(&self) -> MediaSessionId {
        match self {
            Self::Status { session, .. }
            | Self::Activated { session, .. }
            | Self::Ended { session, .. } => *session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completed_minigame_can_still_fail() {
        assert!(SessionOutcome::MinigameCompleted(json!({"score": 10})).succeeded());
        assert!(!SessionOutcome::MinigameCompleted(json!({"success": false})).succeeded());
        assert!(!SessionOutcome::MinigameFailed(json!({})).succeeded());
        assert!(SessionOutcome::Finished.succeeded());
    }
}
