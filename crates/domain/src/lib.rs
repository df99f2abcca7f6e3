//! Story vocabulary shared by the protocol and presenter crates.

pub mod attributes;
pub mod common;
pub mod error;
pub mod ids;
pub mod story;
pub mod types;

pub use attributes::{AttributeValue, Effects, PlayerAttributes};
pub use error::DomainError;
pub use ids::{ChapterId, MinigameId, ResourceId};
pub use story::{Chapter, ChapterKind, Choice, ChoiceRecord, MinigameStage, START_CHAPTER};
pub use types::{AwaitingInput, MediaActivity, MediaKind};
