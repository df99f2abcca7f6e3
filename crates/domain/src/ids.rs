//! String-backed identifiers.
//!
//! Chapter and resource ids are authored by content, not generated, so they
//! wrap a `String` rather than a UUID.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! define_name {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Builds an id, rejecting blank input.
            pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::invalid_id(concat!($label, " cannot be empty")));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_name!(ChapterId, "chapter id");
define_name!(MinigameId, "minigame id");
define_name!(ResourceId, "resource id");

/// Extension used for narration resources.
pub const AUDIO_EXTENSION: &str = "mp3";
/// Content type suffix used for minigame bundles.
pub const MINIGAME_EXTENSION: &str = "html";
/// Narration section used when a chapter does not name one.
pub const DEFAULT_SECTION: &str = "main";

impl ResourceId {
    /// `chapter_<chapterId>_<section>.mp3`
    pub fn narration(chapter: &ChapterId, section: Option<&str>) -> Self {
        let section = section.unwrap_or(DEFAULT_SECTION);
        Self(format!("chapter_{chapter}_{section}.{AUDIO_EXTENSION}"))
    }

    /// `<minigameId>.html`
    pub fn minigame(id: &MinigameId) -> Self {
        Self(format!("{id}.{MINIGAME_EXTENSION}"))
    }
}
