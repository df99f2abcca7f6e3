//! Message types carried inside envelopes
//!
//! Both enums are internally tagged on `type` with snake_case tags and
//! camelCase fields, matching what the orchestrator emits.

use serde::{Deserialize, Serialize};
use whiskers_domain::{
    AwaitingInput, ChapterId, ChapterKind, Choice, MinigameId, PlayerAttributes, ResourceId,
};

// =============================================================================
// Inbound Messages (Orchestrator → Presenter)
// =============================================================================

/// Control messages sent by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    /// Advance past a chapter that waits for a plain "continue"
    ProceedChapter,
    /// Commit the choice at `choice_index`
    MakeChoice { choice_index: usize },
    /// Move the highlighted choice one step
    NavigateChoice { direction: Direction },
    ScrollUp,
    ScrollDown,
    /// Raw input forwarded to the running minigame
    MinigameInput { input: String },
    ResetGame,
    /// Ask the presenter to republish its current snapshot
    StatusRequest,
    /// Forward compatibility: unrecognized `type` values land here
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProceedChapter => "proceed_chapter",
            Self::MakeChoice { .. } => "make_choice",
            Self::NavigateChoice { .. } => "navigate_choice",
            Self::ScrollUp => "scroll_up",
            Self::ScrollDown => "scroll_down",
            Self::MinigameInput { .. } => "minigame_input",
            Self::ResetGame => "reset_game",
            Self::StatusRequest => "status_request",
            Self::Unknown => "unknown",
        }
    }
}

/// Up/down, used for both choice navigation and scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

// =============================================================================
// Outbound Messages (Presenter → Orchestrator)
// =============================================================================

/// Feature switches reported in `app_ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesEnabled {
    pub audio: bool,
    pub minigames: bool,
    pub story_engine: bool,
}

/// Where input is currently directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputContext {
    Story,
    Minigame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioStatus {
    Loading,
    Started,
    Paused,
    Finished,
    Stopped,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinigameStatus {
    Started,
    Progress,
    Completed,
    Failed,
    Error,
}

/// Notifications published by the presenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    AppReady {
        development_mode: bool,
        features_enabled: FeaturesEnabled,
    },
    ChapterChanged {
        current_chapter: ChapterId,
        chapter_title: String,
        chapter_type: ChapterKind,
        player_state: PlayerAttributes,
    },
    ChoicesAvailable {
        chapter: ChapterId,
        choices: Vec<Choice>,
        current_selection: usize,
    },
    /// The envelope timestamp doubles as the moment the choice was made.
    ChoiceMade {
        chapter: ChapterId,
        choice_index: usize,
        choice_text: String,
        next_chapter: ChapterId,
    },
    ChoiceSelected {
        choice_index: usize,
        choice_text: String,
    },
    ReadyForInput {
        context: InputContext,
        awaiting_input_type: AwaitingInput,
    },
    ScrollStatus {
        direction: Direction,
        at_top: bool,
        at_bottom: bool,
    },
    AudioStatus {
        status: AudioStatus,
        #[serde(default)]
        audio_file: Option<ResourceId>,
    },
    MinigameStatus {
        status: MinigameStatus,
        #[serde(default)]
        minigame_id: Option<MinigameId>,
        #[serde(default)]
        result: Option<serde_json::Value>,
    },
    GameReset {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AppReady { .. } => "app_ready",
            Self::ChapterChanged { .. } => "chapter_changed",
            Self::ChoicesAvailable { .. } => "choices_available",
            Self::ChoiceMade { .. } => "choice_made",
            Self::ChoiceSelected { .. } => "choice_selected",
            Self::ReadyForInput { .. } => "ready_for_input",
            Self::ScrollStatus { .. } => "scroll_status",
            Self::AudioStatus { .. } => "audio_status",
            Self::MinigameStatus { .. } => "minigame_status",
            Self::GameReset { .. } => "game_reset",
        }
    }

    pub fn reset_succeeded() -> Self {
        Self::GameReset {
            success: true,
            error: None,
        }
    }

    pub fn reset_failed(error: impl Into<String>) -> Self {
        Self::GameReset {
            success: false,
            error: Some(error.into()),
        }
    }
}
