//! Infrastructure layer - adapters behind the presenter's ports.

pub mod clock;
pub mod headless;
pub mod messaging;
pub mod story;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
