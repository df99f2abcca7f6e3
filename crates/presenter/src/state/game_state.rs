//! GameState - the presenter's single authoritative game record
//!
//! # Design
//!
//! - **Private fields**: only the transitions below can change a state
//! - **Pure transitions**: each takes `&self` and returns the next state,
//!   so a rejected transition leaves the prior state untouched
//! - **Choices and selection move together**: every transition that
//!   touches `choices` also sets `selected_index`

use chrono::{DateTime, Utc};
use thiserror::Error;
use whiskers_domain::{
    AwaitingInput, Chapter, ChapterId, Choice, ChoiceRecord, Effects, MediaActivity,
    PlayerAttributes,
};
use whiskers_protocol::Direction;

/// A state that should be unreachable. Seeing one means a defect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateInvariantError {
    #[error("Current chapter id is empty")]
    EmptyChapter,

    #[error("Selected index {index} is outside {len} choices")]
    SelectionOutOfRange { index: usize, len: usize },

    #[error("Awaiting a choice but no choices are offered")]
    ChoiceWithoutChoices,
}

/// # Invariants
///
/// - `current_chapter` is non-empty
/// - `selected_index < choices.len()` when choices exist, else `0`
/// - `awaiting_input == Choice` implies choices exist
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    connected: bool,
    current_chapter: ChapterId,
    attributes: PlayerAttributes,
    choices: Vec<Choice>,
    selected_index: usize,
    awaiting_input: AwaitingInput,
    media_active: MediaActivity,
    history: Vec<ChoiceRecord>,
}

impl GameState {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Fresh state positioned at `start`, waiting to proceed into it.
    pub fn initial(start: ChapterId) -> Self {
        Self {
            connected: false,
            current_chapter: start,
            attributes: PlayerAttributes::default(),
            choices: Vec::new(),
            selected_index: 0,
            awaiting_input: AwaitingInput::Proceed,
            media_active: MediaActivity::None,
            history: Vec::new(),
        }
    }

    /// Fresh state that keeps only the connection flag.
    pub fn reset(&self, start: ChapterId) -> Self {
        Self {
            connected: self.connected,
            ..Self::initial(start)
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn current_chapter(&self) -> &ChapterId {
        &self.current_chapter
    }

    pub fn attributes(&self) -> &PlayerAttributes {
        &self.attributes
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn selected_choice(&self) -> Option<&Choice> {
        self.choices.get(self.selected_index)
    }

    pub fn awaiting_input(&self) -> AwaitingInput {
        self.awaiting_input
    }

    pub fn media_active(&self) -> MediaActivity {
        self.media_active
    }

    pub fn history(&self) -> &[ChoiceRecord] {
        &self.history
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    pub fn with_connected(&self, connected: bool) -> Self {
        Self {
            connected,
            ..self.clone()
        }
    }

    pub fn with_media(&self, media_active: MediaActivity) -> Self {
        Self {
            media_active,
            ..self.clone()
        }
    }

    /// Positions the story at `chapter` and offers its choices.
    pub fn enter_chapter(&self, chapter: &Chapter) -> Self {
        Self {
            current_chapter: chapter.id.clone(),
            choices: chapter.choices.clone(),
            selected_index: 0,
            awaiting_input: chapter.awaiting_input(),
            ..self.clone()
        }
    }

    /// Moves the selection one step, clamped to the offered choices.
    ///
    /// Returns `None` when nothing would change.
    pub fn navigate(&self, direction: Direction) -> Option<Self> {
        if self.choices.is_empty() {
            return None;
        }
        let last = self.choices.len() - 1;
        let selected_index = match direction {
            Direction::Up => self.selected_index.checked_sub(1)?,
            Direction::Down if self.selected_index < last => self.selected_index + 1,
            Direction::Down => return None,
        };
        Some(Self {
            selected_index,
            ..self.clone()
        })
    }

    /// Commits the choice at `index`: applies its effects, records it and
    /// withdraws the offered choices until the next chapter is entered.
    ///
    /// Returns `None` unless a choice is awaited and `index` is offered.
    pub fn commit_choice(&self, index: usize, at: DateTime<Utc>) -> Option<(Self, Choice)> {
        if self.awaiting_input != AwaitingInput::Choice {
            return None;
        }
        let choice = self.choices.get(index)?.clone();

        let mut history = self.history.clone();
        history.push(ChoiceRecord {
            chapter: self.current_chapter.clone(),
            choice_index: index,
            choice_text: choice.text.clone(),
            timestamp: at,
        });

        let next = Self {
            attributes: self.attributes.apply_effects(&choice.effects),
            choices: Vec::new(),
            selected_index: 0,
            awaiting_input: AwaitingInput::None,
            history,
            ..self.clone()
        };
        Some((next, choice))
    }

    /// Overwrites recognized attributes; unknown keys are ignored.
    pub fn apply_effects(&self, effects: &Effects) -> Self {
        Self {
            attributes: self.attributes.apply_effects(effects),
            ..self.clone()
        }
    }

    pub fn check_invariants(&self) -> Result<(), StateInvariantError> {
        if self.current_chapter.as_str().is_empty() {
            return Err(StateInvariantError::EmptyChapter);
        }
        let len = self.choices.len();
        let in_range = if len == 0 {
            self.selected_index == 0
        } else {
            self.selected_index < len
        };
        if !in_range {
            return Err(StateInvariantError::SelectionOutOfRange {
                index: self.selected_index,
                len,
            });
        }
        if self.awaiting_input == AwaitingInput::Choice && len == 0 {
            return Err(StateInvariantError::ChoiceWithoutChoices);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whiskers_domain::{attributes::COURAGE, AttributeValue};

    fn hall() -> Chapter {
        let mut brave = Choice::new("A", "garden");
        brave
            .effects
            .insert(COURAGE.to_string(), AttributeValue::from("Brave"));
        brave
            .effects
            .insert("wings".to_string(), AttributeValue::Flag(true));
        Chapter::new("hall", "The Hall").with_choices(vec![brave, Choice::new("B", "cellar")])
    }

    fn in_hall() -> GameState {
        GameState::initial(ChapterId::from("start")).enter_chapter(&hall())
    }

    #[test]
    fn initial_state_waits_to_proceed() {
        let state = GameState::initial(ChapterId::from("start"));
        assert_eq!(state.current_chapter().as_str(), "start");
        assert!(state.choices().is_empty());
        assert_eq!(state.awaiting_input(), AwaitingInput::Proceed);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn reset_keeps_only_connection() {
        let (chosen, _) = in_hall()
            .with_connected(true)
            .commit_choice(0, Utc::now())
            .expect("choice");
        let fresh = chosen.reset(ChapterId::from("start"));

        assert!(fresh.connected());
        assert!(fresh.history().is_empty());
        assert_eq!(fresh.attributes(), &PlayerAttributes::default());
        assert_eq!(fresh, GameState::initial(ChapterId::from("start")).with_connected(true));
    }

    #[test]
    fn navigate_is_clamped() {
        let state = in_hall();
        assert!(state.navigate(Direction::Up).is_none());

        let down = state.navigate(Direction::Down).expect("moves down");
        assert_eq!(down.selected_index(), 1);
        assert!(down.navigate(Direction::Down).is_none());

        let up = down.navigate(Direction::Up).expect("moves up");
        assert_eq!(up.selected_index(), 0);
    }

    #[test]
    fn navigate_without_choices_does_nothing() {
        let state = GameState::initial(ChapterId::from("start"));
        assert!(state.navigate(Direction::Down).is_none());
        assert!(state.navigate(Direction::Up).is_none());
    }

    #[test]
    fn commit_choice_applies_known_effects_and_records_history() {
        let (next, choice) = in_hall().commit_choice(0, Utc::now()).expect("choice");

        assert_eq!(choice.next_chapter.as_str(), "garden");
        assert_eq!(next.attributes().get(COURAGE), Some(&AttributeValue::from("Brave")));
        assert!(!next.attributes().contains("wings"));
        assert_eq!(next.history().len(), 1);
        assert_eq!(next.history()[0].choice_text, "A");
        assert!(next.choices().is_empty());
        assert_eq!(next.awaiting_input(), AwaitingInput::None);
        assert!(next.check_invariants().is_ok());
    }

    #[test]
    fn commit_choice_requires_a_pending_choice() {
        assert!(in_hall().commit_choice(2, Utc::now()).is_none());
        assert!(GameState::initial(ChapterId::from("start"))
            .commit_choice(0, Utc::now())
            .is_none());
    }

    #[test]
    fn invariant_check_catches_inconsistent_selection() {
        let mut state = in_hall();
        state.selected_index = 5;
        assert_eq!(
            state.check_invariants(),
            Err(StateInvariantError::SelectionOutOfRange { index: 5, len: 2 })
        );

        let mut state = in_hall();
        state.choices.clear();
        state.selected_index = 0;
        assert_eq!(
            state.check_invariants(),
            Err(StateInvariantError::ChoiceWithoutChoices)
        );
    }
}
