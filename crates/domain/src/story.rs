//! Story content: chapters, choices and the audit record of choices made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attributes::Effects;
use crate::error::DomainError;
use crate::ids::{ChapterId, MinigameId, ResourceId, DEFAULT_SECTION};
use crate::types::AwaitingInput;

/// Chapter every fresh game starts from.
pub const START_CHAPTER: &str = "start";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterKind {
    #[default]
    Story,
    Minigame,
    Ending,
}

/// A selectable option. Immutable once loaded from content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub text: String,
    pub next_chapter: ChapterId,
    #[serde(default)]
    pub effects: Effects,
}

impl Choice {
    pub fn new(text: impl Into<String>, next_chapter: impl Into<ChapterId>) -> Self {
        Self {
            text: text.into(),
            next_chapter: next_chapter.into(),
            effects: Effects::new(),
        }
    }
}

/// The minigame played in a minigame chapter and where the story goes after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinigameStage {
    pub id: MinigameId,
    #[serde(default)]
    pub params: serde_json::Value,
    pub on_complete: ChapterId,
    #[serde(default)]
    pub on_failure: Option<ChapterId>,
}

impl MinigameStage {
    /// Chapter to continue with once the minigame ends.
    pub fn next_chapter(&self, succeeded: bool) -> &ChapterId {
        if succeeded {
            &self.on_complete
        } else {
            self.on_failure.as_ref().unwrap_or(&self.on_complete)
        }
    }
}

fn default_narration() -> Option<String> {
    Some(DEFAULT_SECTION.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: ChapterKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub next: Option<ChapterId>,
    /// Narration section; `null` in content disables narration.
    #[serde(default = "default_narration")]
    pub narration: Option<String>,
    #[serde(default)]
    pub minigame: Option<MinigameStage>,
}

impl Chapter {
    pub fn new(id: impl Into<ChapterId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: ChapterKind::Story,
            text: String::new(),
            choices: Vec::new(),
            next: None,
            narration: default_narration(),
            minigame: None,
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_next(mut self, next: impl Into<ChapterId>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn with_minigame(mut self, stage: MinigameStage) -> Self {
        self.kind = ChapterKind::Minigame;
        self.minigame = Some(stage);
        self
    }

    pub fn without_narration(mut self) -> Self {
        self.narration = None;
        self
    }

    pub fn ending(mut self) -> Self {
        self.kind = ChapterKind::Ending;
        self
    }

    /// The input this chapter waits for once entered.
    ///
    /// Minigame chapters advance on the minigame's own outcome, so they wait
    /// for nothing from the orchestrator.
    pub fn awaiting_input(&self) -> AwaitingInput {
        if self.kind == ChapterKind::Minigame {
            AwaitingInput::None
        } else if !self.choices.is_empty() {
            AwaitingInput::Choice
        } else if self.next.is_some() {
            AwaitingInput::Proceed
        } else {
            AwaitingInput::None
        }
    }

    pub fn narration_resource(&self) -> Option<ResourceId> {
        if self.kind == ChapterKind::Minigame {
            return None;
        }
        self.narration
            .as_deref()
            .map(|section| ResourceId::narration(&self.id, Some(section)))
    }

    /// Every chapter this one can lead to.
    pub fn targets(&self) -> impl Iterator<Item = &ChapterId> {
        let from_minigame = self
            .minigame
            .iter()
            .flat_map(|stage| std::iter::once(&stage.on_complete).chain(stage.on_failure.iter()));
        self.choices
            .iter()
            .map(|choice| &choice.next_chapter)
            .chain(self.next.iter())
            .chain(from_minigame)
    }

    /// Checks the chapter on its own; cross-chapter links are checked by the
    /// content store.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DomainError::invalid_id("chapter id cannot be empty"));
        }
        if self.kind == ChapterKind::Minigame && self.minigame.is_none() {
            return Err(DomainError::validation(format!(
                "minigame chapter '{}' has no minigame stage",
                self.id
            )));
        }
        if let Some(index) = self.choices.iter().position(|c| c.text.trim().is_empty()) {
            return Err(DomainError::validation(format!(
                "choice {index} of chapter '{}' has no text",
                self.id
            )));
        }
        Ok(())
    }
}

/// Append-only audit entry for a committed choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    pub chapter: ChapterId,
    pub choice_index: usize,
    pub choice_text: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> MinigameStage {
        MinigameStage {
            id: MinigameId::from("bubble_pop"),
            params: serde_json::Value::Null,
            on_complete: ChapterId::from("after_game"),
            on_failure: None,
        }
    }

    #[test]
    fn awaiting_input_follows_chapter_shape() {
        let proceed = Chapter::new("start", "Start").with_next("hall");
        assert_eq!(proceed.awaiting_input(), AwaitingInput::Proceed);

        let choice = Chapter::new("hall", "Hall").with_choices(vec![Choice::new("Left", "a")]);
        assert_eq!(choice.awaiting_input(), AwaitingInput::Choice);

        let game = Chapter::new("game", "Game").with_minigame(stage());
        assert_eq!(game.awaiting_input(), AwaitingInput::None);

        let end = Chapter::new("end", "The End").ending();
        assert_eq!(end.awaiting_input(), AwaitingInput::None);
    }

    #[test]
    fn minigame_failure_falls_back_to_completion_target() {
        let mut stage = stage();
        assert_eq!(stage.next_chapter(false).as_str(), "after_game");
        stage.on_failure = Some(ChapterId::from("retry"));
        assert_eq!(stage.next_chapter(false).as_str(), "retry");
        assert_eq!(stage.next_chapter(true).as_str(), "after_game");
    }

    #[test]
    fn narration_defaults_to_main_section() {
        let chapter: Chapter =
            serde_json::from_str(r#"{"id": "start", "title": "Start", "next": "hall"}"#)
                .expect("deserialize");
        assert_eq!(
            chapter.narration_resource().map(|r| r.into_inner()),
            Some("chapter_start_main.mp3".to_string())
        );

        let silent: Chapter =
            serde_json::from_str(r#"{"id": "quiet", "title": "Quiet", "narration": null}"#)
                .expect("deserialize");
        assert_eq!(silent.narration_resource(), None);
    }

    #[test]
    fn targets_cover_choices_next_and_minigame() {
        let chapter = Chapter::new("x", "X")
            .with_choices(vec![Choice::new("A", "a"), Choice::new("B", "b")])
            .with_next("n");
        let targets: Vec<&str> = chapter.targets().map(ChapterId::as_str).collect();
        assert_eq!(targets, vec!["a", "b", "n"]);

        let game = Chapter::new("g", "G").with_minigame(MinigameStage {
            on_failure: Some(ChapterId::from("lost")),
            ..stage()
        });
        let targets: Vec<&str> = game.targets().map(ChapterId::as_str).collect();
        assert_eq!(targets, vec!["after_game", "lost"]);
    }

    #[test]
    fn validate_rejects_broken_chapters() {
        let mut game = Chapter::new("g", "G").with_minigame(stage());
        assert!(game.validate().is_ok());
        game.minigame = None;
        assert!(game.validate().is_err());

        let blank_choice = Chapter::new("c", "C").with_choices(vec![Choice::new(" ", "a")]);
        assert!(blank_choice.validate().is_err());
    }
}
