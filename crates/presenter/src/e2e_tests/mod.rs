//! End-to-end tests: the full presenter wired to an in-memory broker.
//!
//! Every scenario drives the presenter the way the orchestrator does, by
//! publishing JSON envelopes to the broker, and asserts on what comes back
//! out of it together with the game state.
//!
//! ```bash
//! cargo test -p whiskers-presenter --lib e2e_tests
//! ```

mod connection_tests;
mod e2e_helpers;

pub use e2e_helpers::*;
