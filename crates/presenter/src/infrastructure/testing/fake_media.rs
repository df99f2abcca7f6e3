//! Media backend that plays nothing but records everything.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use whiskers_domain::ResourceId;

use crate::ports::outbound::{MediaBackend, MediaLoadError, MediaResource, PlaybackError};

/// Shared, ordered record of what happened to every resource.
#[derive(Clone, Default)]
pub struct MediaLog(Arc<Mutex<Vec<String>>>);

impl MediaLog {
    fn push(&self, entry: String) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

#[derive(Default)]
struct ResourceState {
    playing: bool,
    pending_play: bool,
    released: bool,
    corrupted: bool,
    volume: f32,
    rewinds: u32,
}

pub struct FakeResource {
    id: ResourceId,
    log: MediaLog,
    play_delay: Duration,
    autoplay_blocked: bool,
    state: Mutex<ResourceState>,
    ended: Notify,
}

impl FakeResource {
    pub fn new(id: &str) -> Arc<Self> {
        Self::with_log(ResourceId::from(id), MediaLog::default(), Duration::ZERO, false)
    }

    fn with_log(id: ResourceId, log: MediaLog, play_delay: Duration, autoplay_blocked: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            log,
            play_delay,
            autoplay_blocked,
            state: Mutex::new(ResourceState {
                volume: 1.0,
                ..ResourceState::default()
            }),
            ended: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ResourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plays to the end.
    pub fn finish(&self) {
        self.lock().playing = false;
        self.log.push(format!("ended:{}", self.id));
        self.ended.notify_one();
    }

    pub fn corrupt(&self) {
        self.lock().corrupted = true;
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    pub fn rewinds(&self) -> u32 {
        self.lock().rewinds
    }
}

#[async_trait]
impl MediaResource for FakeResource {
    fn id(&self) -> &ResourceId {
        &self.id
    }

    async fn play(&self) -> Result<(), PlaybackError> {
        {
            let mut state = self.lock();
            if state.released {
                return Err(PlaybackError::Failed(format!("{} was released", self.id)));
            }
            state.pending_play = true;
        }
        self.log.push(format!("play:{}", self.id));
        if !self.play_delay.is_zero() {
            tokio::time::sleep(self.play_delay).await;
        }

        let mut state = self.lock();
        if !state.pending_play {
            return Err(PlaybackError::Failed("interrupted by pause".to_string()));
        }
        state.pending_play = false;
        if self.autoplay_blocked {
            return Err(PlaybackError::AutoplayBlocked);
        }
        state.playing = true;
        drop(state);
        self.log.push(format!("playing:{}", self.id));
        Ok(())
    }

    fn pause(&self) {
        let was_playing = {
            let mut state = self.lock();
            let was_playing = state.playing || state.pending_play;
            state.playing = false;
            state.pending_play = false;
            was_playing
        };
        if was_playing {
            self.log.push(format!("paused:{}", self.id));
        }
    }

    fn rewind(&self) {
        self.lock().rewinds += 1;
    }

    fn release(&self) {
        {
            let mut state = self.lock();
            state.playing = false;
            state.released = true;
        }
        self.log.push(format!("released:{}", self.id));
    }

    fn set_volume(&self, volume: f32) {
        self.lock().volume = volume;
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn is_corrupted(&self) -> bool {
        let state = self.lock();
        state.corrupted || state.released
    }

    async fn ended(&self) {
        self.ended.notified().await;
    }
}

#[derive(Default)]
struct BackendState {
    opened: Vec<Arc<FakeResource>>,
    missing: HashSet<String>,
    play_delay: Duration,
    autoplay_blocked: bool,
}

/// Opens [`FakeResource`]s. Clones share state.
#[derive(Clone, Default)]
pub struct FakeMediaBackend {
    log: MediaLog,
    state: Arc<Mutex<BackendState>>,
}

impl FakeMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every `play()` takes this long to resolve.
    pub fn with_play_delay(self, delay: Duration) -> Self {
        self.lock().play_delay = delay;
        self
    }

    pub fn block_autoplay(&self) {
        self.lock().autoplay_blocked = true;
    }

    pub fn set_missing(&self, id: &str) {
        self.lock().missing.insert(id.to_string());
    }

    pub fn log(&self) -> MediaLog {
        self.log.clone()
    }

    /// Most recently opened instance of `id`.
    pub fn resource(&self, id: &str) -> Option<Arc<FakeResource>> {
        self.lock()
            .opened
            .iter()
            .rev()
            .find(|r| r.id.as_str() == id)
            .cloned()
    }

    pub fn open_count(&self, id: &str) -> usize {
        self.lock()
            .opened
            .iter()
            .filter(|r| r.id.as_str() == id)
            .count()
    }

    pub fn playing(&self) -> Vec<String> {
        self.lock()
            .opened
            .iter()
            .filter(|r| r.is_playing())
            .map(|r| r.id.to_string())
            .collect()
    }
}

#[async_trait]
impl MediaBackend for FakeMediaBackend {
    async fn open(&self, resource: &ResourceId) -> Result<Arc<dyn MediaResource>, MediaLoadError> {
        let (play_delay, autoplay_blocked) = {
            let state = self.lock();
            if state.missing.contains(resource.as_str()) {
                return Err(MediaLoadError::NotFound(resource.clone()));
            }
            (state.play_delay, state.autoplay_blocked)
        };
        let opened = FakeResource::with_log(resource.clone(), self.log.clone(), play_delay, autoplay_blocked);
        self.log.push(format!("opened:{resource}"));
        self.lock().opened.push(Arc::clone(&opened));
        Ok(opened)
    }
}
