//! Game state and the store that owns it.

mod game_state;
mod store;

pub use game_state::{GameState, StateInvariantError};
pub use store::StateStore;
