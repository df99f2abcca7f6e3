//! Presenter application layer: media sessions, routing and reset.

pub mod context;
pub mod media;
pub mod presenter;
pub mod reset;
pub mod router;

pub use context::{PresenterContext, PresenterSettings, ProgressionError};
pub use presenter::Presenter;
pub use reset::{ResetCoordinator, ResetError};
pub use router::MessageRouter;
