//! Whiskers Presenter - message-driven state synchronization for the story
//! presenter.
//!
//! The presenter receives commands from an orchestrator over a pub/sub
//! channel, advances the story, plays chapter media and publishes every
//! state change back.
//!
//! - [`infrastructure::messaging`]: the channel adapter (connect, fallback,
//!   reconnect, outbound queue)
//! - [`application::media`]: one active media session at a time
//! - [`state`]: the game state and its store
//! - [`application::router`]: inbound message handling
//! - [`application::reset`]: return to the start chapter

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
pub mod state;

#[cfg(test)]
mod e2e_tests;
