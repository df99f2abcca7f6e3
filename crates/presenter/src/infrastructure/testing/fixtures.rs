//! A small story and an in-memory content store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use whiskers_domain::{
    attributes::{COURAGE, HEALTH},
    AttributeValue, Chapter, ChapterId, Choice, MinigameId, MinigameStage,
};

use crate::ports::outbound::{ContentError, StoryContent, StoryContentFactory};

/// start → hall → {garden (minigame) → ending_good | ending_bad, cellar → hall}
pub fn sample_story() -> Vec<Chapter> {
    let mut brave = Choice::new("Explore the garden", "garden");
    brave
        .effects
        .insert(COURAGE.to_string(), AttributeValue::from("Brave"));
    let mut careful = Choice::new("Sneak into the cellar", "cellar");
    careful
        .effects
        .insert(HEALTH.to_string(), AttributeValue::Integer(90));

    vec![
        Chapter::new("start", "The Beginning").with_next("hall"),
        Chapter::new("hall", "The Hall").with_choices(vec![brave, careful]),
        Chapter::new("garden", "Bubble Garden").with_minigame(MinigameStage {
            id: MinigameId::from("bubble_pop"),
            params: json!({"difficulty": "easy"}),
            on_complete: ChapterId::from("ending_good"),
            on_failure: Some(ChapterId::from("ending_bad")),
        }),
        Chapter::new("cellar", "The Cellar")
            .with_choices(vec![Choice::new("Go back upstairs", "hall")]),
        Chapter::new("ending_good", "Home Again").ending(),
        Chapter::new("ending_bad", "Soggy Whiskers")
            .ending()
            .without_narration(),
    ]
}

pub struct InMemoryStory {
    chapters: HashMap<ChapterId, Chapter>,
    resets: AtomicUsize,
    fail_reset: AtomicBool,
}

impl InMemoryStory {
    pub fn new(chapters: Vec<Chapter>) -> Arc<Self> {
        Arc::new(Self {
            chapters: chapters.into_iter().map(|c| (c.id.clone(), c)).collect(),
            resets: AtomicUsize::new(0),
            fail_reset: AtomicBool::new(false),
        })
    }

    pub fn sample() -> Arc<Self> {
        Self::new(sample_story())
    }

    pub fn fail_resets(&self) {
        self.fail_reset.store(true, Ordering::SeqCst);
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl StoryContent for InMemoryStory {
    fn chapter(&self, id: &ChapterId) -> Result<Chapter, ContentError> {
        self.chapters
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::ChapterNotFound(id.clone()))
    }

    fn reset(&self) -> Result<(), ContentError> {
        if self.fail_reset.load(Ordering::SeqCst) {
            return Err(ContentError::Unavailable("reset refused".to_string()));
        }
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Rebuilds the sample story, optionally refusing to.
#[derive(Default)]
pub struct InMemoryStoryFactory {
    fail: AtomicBool,
    builds: AtomicUsize,
}

impl InMemoryStoryFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_builds(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl StoryContentFactory for InMemoryStoryFactory {
    fn build(&self) -> Result<Arc<dyn StoryContent>, ContentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ContentError::Unavailable("story source missing".to_string()));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryStory::sample())
    }
}
