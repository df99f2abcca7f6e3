//! JSON story file adapter.
//!
//! The file holds every chapter of the story:
//!
//! ```json
//! {"chapters": [{"id": "start", "title": "The Beginning", "next": "hall"}]}
//! ```
//!
//! A story is only accepted as a whole: every chapter must pass its own
//! checks, ids must be unique and every link must name a chapter in the file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use whiskers_domain::{Chapter, ChapterId, DomainError};

use crate::ports::outbound::{ContentError, StoryContent, StoryContentFactory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDocument {
    pub chapters: Vec<Chapter>,
}

impl StoryDocument {
    pub fn read(path: &Path) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ContentError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| ContentError::Invalid(DomainError::parse(format!("{}: {e}", path.display()))))
    }

    /// Indexes the chapters by id after checking the story as a whole.
    pub fn into_index(self) -> Result<HashMap<ChapterId, Chapter>, ContentError> {
        if self.chapters.is_empty() {
            return Err(DomainError::validation("story has no chapters").into());
        }

        let mut index = HashMap::with_capacity(self.chapters.len());
        for chapter in self.chapters {
            chapter.validate()?;
            if index.contains_key(&chapter.id) {
                return Err(DomainError::validation(format!(
                    "chapter '{}' is defined twice",
                    chapter.id
                ))
                .into());
            }
            index.insert(chapter.id.clone(), chapter);
        }

        let known: HashSet<&ChapterId> = index.keys().collect();
        for chapter in index.values() {
            if let Some(missing) = chapter.targets().find(|t| !known.contains(t)) {
                return Err(DomainError::validation(format!(
                    "chapter '{}' links to unknown chapter '{missing}'",
                    chapter.id
                ))
                .into());
            }
        }
        Ok(index)
    }
}

/// Chapters read from a JSON file, reloaded from disk on reset.
pub struct JsonStoryContent {
    path: PathBuf,
    chapters: RwLock<HashMap<ChapterId, Chapter>>,
}

impl JsonStoryContent {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ContentError> {
        let path = path.into();
        let chapters = StoryDocument::read(&path)?.into_index()?;
        info!(path = %path.display(), chapters = chapters.len(), "Story loaded");
        Ok(Self {
            path,
            chapters: RwLock::new(chapters),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.chapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StoryContent for JsonStoryContent {
    fn chapter(&self, id: &ChapterId) -> Result<Chapter, ContentError> {
        self.chapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::ChapterNotFound(id.clone()))
    }

    /// Rereads the file. The chapters in memory survive a failed reload.
    fn reset(&self) -> Result<(), ContentError> {
        let fresh = StoryDocument::read(&self.path)?.into_index()?;
        debug!(path = %self.path.display(), chapters = fresh.len(), "Story reloaded");
        *self
            .chapters
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }
}

/// Builds a fresh [`JsonStoryContent`] from the same file.
#[derive(Debug, Clone)]
pub struct JsonStoryFactory {
    path: PathBuf,
}

impl JsonStoryFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StoryContentFactory for JsonStoryFactory {
    fn build(&self) -> Result<Arc<dyn StoryContent>, ContentError> {
        Ok(Arc::new(JsonStoryContent::load(self.path.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use whiskers_domain::{AwaitingInput, ChapterKind};

    use super::*;
    use crate::infrastructure::testing::sample_story;

    fn story_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(json.as_bytes()).expect("write story");
        file
    }

    fn sample_file() -> NamedTempFile {
        let doc = StoryDocument {
            chapters: sample_story(),
        };
        story_file(&serde_json::to_string(&doc).expect("serialize story"))
    }

    #[test]
    fn loads_chapters_from_json() {
        let file = story_file(
            r#"{"chapters": [
                {"id": "start", "title": "The Beginning", "next": "end"},
                {"id": "end", "title": "The End", "type": "ending", "narration": null}
            ]}"#,
        );

        let story = JsonStoryContent::load(file.path()).expect("valid story");

        assert_eq!(story.len(), 2);
        let start = story.chapter(&ChapterId::from("start")).expect("start");
        assert_eq!(start.awaiting_input(), AwaitingInput::Proceed);
        let end = story.chapter(&ChapterId::from("end")).expect("end");
        assert_eq!(end.kind, ChapterKind::Ending);
        assert!(end.narration_resource().is_none());
        assert_eq!(
            story.chapter(&ChapterId::from("attic")),
            Err(ContentError::ChapterNotFound(ChapterId::from("attic")))
        );
    }

    #[test]
    fn sample_story_round_trips_through_a_file() {
        let file = sample_file();
        let story = JsonStoryContent::load(file.path()).expect("valid story");
        assert_eq!(story.len(), sample_story().len());
    }

    #[test]
    fn rejects_dangling_links() {
        let file = story_file(
            r#"{"chapters": [{"id": "start", "title": "Start", "next": "nowhere"}]}"#,
        );

        let err = JsonStoryContent::load(file.path()).err().expect("dangling link");
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn rejects_duplicate_and_empty_stories() {
        let twice = story_file(
            r#"{"chapters": [{"id": "start", "title": "A"}, {"id": "start", "title": "B"}]}"#,
        );
        assert!(matches!(
            JsonStoryContent::load(twice.path()),
            Err(ContentError::Invalid(DomainError::Validation(_)))
        ));

        let empty = story_file(r#"{"chapters": []}"#);
        assert!(JsonStoryContent::load(empty.path()).is_err());
    }

    #[test]
    fn unreadable_files_are_unavailable_and_bad_json_is_invalid() {
        assert!(matches!(
            JsonStoryContent::load("/definitely/not/here.json"),
            Err(ContentError::Unavailable(_))
        ));

        let garbage = story_file("{ chapters: ");
        assert!(matches!(
            JsonStoryContent::load(garbage.path()),
            Err(ContentError::Invalid(DomainError::Parse(_)))
        ));
    }

    #[test]
    fn reset_rereads_the_file_and_keeps_old_chapters_on_failure() {
        let file = story_file(r#"{"chapters": [{"id": "start", "title": "Old"}]}"#);
        let story = JsonStoryContent::load(file.path()).expect("valid story");

        std::fs::write(
            file.path(),
            r#"{"chapters": [{"id": "start", "title": "New"}]}"#,
        )
        .expect("rewrite");
        story.reset().expect("reload");
        assert_eq!(story.chapter(&ChapterId::from("start")).expect("start").title, "New");

        std::fs::write(file.path(), "not json").expect("corrupt");
        assert!(story.reset().is_err());
        assert_eq!(story.chapter(&ChapterId::from("start")).expect("start").title, "New");
    }

    #[test]
    fn factory_builds_from_the_same_file() {
        let file = sample_file();
        let content = JsonStoryFactory::new(file.path()).build().expect("build");
        assert!(content.chapter(&ChapterId::from("garden")).is_ok());

        assert!(JsonStoryFactory::new("/missing/story.json").build().is_err());
    }
}
