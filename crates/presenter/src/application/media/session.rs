//! Media session lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use whiskers_domain::{MediaKind, MinigameId, ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaSessionId(u64);

impl MediaSessionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MediaSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media-{}", self.0)
    }
}

/// Loading → Active → Stopping → Stopped. A session stopped while loading
/// skips Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Loading,
    Active,
    Stopping,
    Stopped,
}

impl SessionState {
    fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Loading, Active) | (Loading, Stopping) | (Active, Stopping) | (Stopping, Stopped)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSession {
    pub id: MediaSessionId,
    pub kind: MediaKind,
    pub resource: ResourceId,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    /// Running on a placeholder timer instead of a real resource
    pub simulated: bool,
}

impl MediaSession {
    pub fn loading(
        id: MediaSessionId,
        kind: MediaKind,
        resource: ResourceId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            resource,
            state: SessionState::Loading,
            started_at,
            simulated: false,
        }
    }

    /// Moves to `next` if that is the following lifecycle step.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if self.state.can_advance_to(next) {
            self.state = next;
            true
        } else {
            tracing::debug!(
                session = %self.id,
                from = ?self.state,
                to = ?next,
                "Ignoring out-of-order session transition"
            );
            false
        }
    }

    /// Walks through Stopping to Stopped from wherever the session is.
    pub fn stop(&mut self) {
        if matches!(self.state, SessionState::Loading | SessionState::Active) {
            self.advance(SessionState::Stopping);
        }
        self.advance(SessionState::Stopped);
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

/// Minigame id from a `<minigameId>.<ext>` resource name.
pub fn minigame_id_of(resource: &ResourceId) -> MinigameId {
    let name = resource.as_str();
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    MinigameId::from(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> MediaSession {
        MediaSession::loading(
            MediaSessionId::new(1),
            MediaKind::Audio,
            ResourceId::from("chapter_start_main.mp3"),
            Utc::now(),
        )
    }

    #[test]
    fn transitions_only_move_forward() {
        let mut s = session();
        assert!(!s.advance(SessionState::Stopped));
        assert!(s.advance(SessionState::Active));
        assert!(!s.advance(SessionState::Loading));
        assert!(s.advance(SessionState::Stopping));
        assert!(!s.advance(SessionState::Active));
        assert!(s.advance(SessionState::Stopped));
    }

    #[test]
    fn stop_from_loading_skips_active() {
        let mut s = session();
        s.stop();
        assert_eq!(s.state, SessionState::Stopped);
        s.stop();
        assert_eq!(s.state, SessionState::Stopped);
    }

    #[test]
    fn minigame_id_strips_extension() {
        assert_eq!(
            minigame_id_of(&ResourceId::from("bubble_pop.html")).as_str(),
            "bubble_pop"
        );
        assert_eq!(minigame_id_of(&ResourceId::from("maze")).as_str(), "maze");
    }
}
