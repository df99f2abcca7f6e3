//! State Store - owns the current `GameState`.
//!
//! Callers compute the next state with `GameState`'s transitions and hand
//! it to [`StateStore::commit`], which only accepts states that hold every
//! invariant.

use tokio::sync::watch;
use tracing::error;
use whiskers_domain::ChapterId;

use super::game_state::{GameState, StateInvariantError};

pub struct StateStore {
    start: ChapterId,
    state: watch::Sender<GameState>,
}

impl StateStore {
    pub fn new(start: ChapterId) -> Self {
        let (state, _) = watch::channel(GameState::initial(start.clone()));
        Self { start, state }
    }

    pub fn start_chapter(&self) -> &ChapterId {
        &self.start
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> GameState {
        self.state.borrow().clone()
    }

    /// Read-only view that follows every commit.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.state.subscribe()
    }

    /// Replaces the current state with `next` if it is consistent.
    pub fn commit(&self, next: GameState) -> Result<(), StateInvariantError> {
        if let Err(e) = next.check_invariants() {
            error!(error = %e, chapter = %next.current_chapter(), "Rejected inconsistent game state");
            return Err(e);
        }
        self.state.send_replace(next);
        Ok(())
    }

    /// Applies `transition` to the current state and commits the result.
    ///
    /// Returns `Ok(false)` when the transition declined to produce a state.
    pub fn update(
        &self,
        transition: impl FnOnce(&GameState) -> Option<GameState>,
    ) -> Result<bool, StateInvariantError> {
        let Some(next) = transition(&self.snapshot()) else {
            return Ok(false);
        };
        self.commit(next)?;
        Ok(true)
    }

    /// Fresh state at the start chapter, keeping the connection flag.
    pub fn reset(&self) -> GameState {
        let fresh = self.snapshot().reset(self.start.clone());
        self.state.send_replace(fresh.clone());
        fresh
    }
}
