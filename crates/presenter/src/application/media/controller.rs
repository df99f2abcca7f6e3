//! Media Session Controller
//!
//! Owns every audio and minigame session. At most one session is Active at a
//! time, a start always fully stops what came before it, and a stop issued
//! while a start is in flight wins.
//!
//! Mutable state sits behind a std mutex that is never held across an await.
//! Full stops are serialized with a watch flag: the first caller claims it,
//! tears everything down, waits out the settle delay and clears it; anyone
//! arriving meanwhile waits for the flag to clear instead of tearing down
//! twice.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use whiskers_domain::{MediaKind, MinigameId, ResourceId};
use whiskers_protocol::{AudioStatus, MinigameStatus};

use super::cache::ResourceCache;
use super::events::{MediaEvent, MediaStatus, SessionOutcome};
use super::session::{minigame_id_of, MediaSession, MediaSessionId, SessionState};
use crate::config::MediaConfig;
use crate::ports::outbound::{
    ClockPort, MediaBackend, MediaLoadError, MediaResource, MinigameCommand, MinigameHost,
    MinigameInstance, MinigameLink, MinigameSignal, MinigameUnloadError, PlaybackError,
    RandomPort,
};

const HISTORY_LIMIT: usize = 20;
const MINIGAME_HISTORY_LIMIT: usize = 10;
const SIMULATED_SUCCESS_PERCENT: i32 = 70;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRecord {
    pub resource: ResourceId,
    pub finished_at: DateTime<Utc>,
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinigameRecord {
    pub minigame: MinigameId,
    pub status: MinigameStatus,
    pub result: Value,
    pub at: DateTime<Utc>,
}

/// Snapshot for debugging and status reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaStats {
    pub current: Option<MediaSession>,
    pub cached: usize,
    pub tracked: usize,
    pub playing: usize,
    pub volume: f32,
    pub muted: bool,
}

/// What has to be torn down when a session stops.
enum Handle {
    Pending,
    Audio(Arc<dyn MediaResource>),
    Minigame(Arc<dyn MinigameInstance>),
    Simulated,
}

struct Current {
    session: MediaSession,
    handle: Handle,
    cancel: CancellationToken,
}

struct Inner {
    /// Bumped by every start and stop; a start only proceeds if it is still the latest.
    generation: u64,
    current: Option<Current>,
    /// Last session started and not superseded since; events from others are stale.
    latest: Option<MediaSessionId>,
    cache: ResourceCache,
    /// Every opened resource not yet released, cached or not.
    tracked: Vec<Arc<dyn MediaResource>>,
    volume: f32,
    muted: bool,
    playback_history: VecDeque<PlaybackRecord>,
    minigame_history: VecDeque<MinigameRecord>,
}

impl Inner {
    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn current_for(&mut self, id: MediaSessionId) -> Option<&mut Current> {
        self.current.as_mut().filter(|c| c.session.id == id)
    }

    fn untrack(&mut self, resource: &Arc<dyn MediaResource>) {
        self.tracked.retain(|r| !Arc::ptr_eq(r, resource));
    }

    /// Pauses everything except `keep`.
    fn silence_others(&self, keep: Option<&Arc<dyn MediaResource>>) {
        let others = self
            .cache
            .iter()
            .chain(self.tracked.iter())
            .filter(|r| keep.map_or(true, |k| !Arc::ptr_eq(r, k)));
        for resource in others {
            if resource.is_playing() {
                debug!(resource = %resource.id(), "Pausing stray playback");
                resource.pause();
                resource.rewind();
            }
        }
    }

    /// Stops the current session. The resource is released unless cached.
    fn teardown_current(&mut self) -> Option<MediaSession> {
        let mut current = self.current.take()?;
        current.cancel.cancel();
        current.session.advance(SessionState::Stopping);
        match &current.handle {
            Handle::Audio(resource) => {
                resource.pause();
                resource.rewind();
                if !self.cache.holds(resource) {
                    resource.release();
                    self.untrack(resource);
                }
            }
            Handle::Minigame(instance) => instance.unload(),
            Handle::Pending | Handle::Simulated => {}
        }
        current.session.advance(SessionState::Stopped);
        Some(current.session)
    }

    fn remember_playback(&mut self, record: PlaybackRecord) {
        if self.playback_history.len() == HISTORY_LIMIT {
            self.playback_history.pop_front();
        }
        self.playback_history.push_back(record);
    }

    fn remember_minigame(&mut self, record: MinigameRecord) {
        if self.minigame_history.len() == MINIGAME_HISTORY_LIMIT {
            self.minigame_history.pop_front();
        }
        self.minigame_history.push_back(record);
    }
}

pub struct MediaSessionController {
    backend: Arc<dyn MediaBackend>,
    minigames: Arc<dyn MinigameHost>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    config: MediaConfig,
    events: mpsc::UnboundedSender<MediaEvent>,
    inner: Mutex<Inner>,
    stopping: watch::Sender<bool>,
    next_id: AtomicU64,
}

impl MediaSessionController {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        minigames: Arc<dyn MinigameHost>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        config: MediaConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<MediaEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (stopping, _) = watch::channel(false);
        let inner = Inner {
            generation: 0,
            current: None,
            latest: None,
            cache: ResourceCache::new(config.cache_capacity),
            tracked: Vec::new(),
            volume: 1.0,
            muted: false,
            playback_history: VecDeque::new(),
            minigame_history: VecDeque::new(),
        };
        let controller = Arc::new(Self {
            backend,
            minigames,
            clock,
            random,
            config,
            events,
            inner: Mutex::new(inner),
            stopping,
            next_id: AtomicU64::new(1),
        });
        (controller, events_rx)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: MediaEvent) {
        if self.events.send(event).is_err() {
            debug!("Media event dropped, nobody is listening");
        }
    }

    fn emit_status(
        &self,
        session: MediaSessionId,
        resource: &ResourceId,
        status: MediaStatus,
        result: Option<Value>,
    ) {
        self.emit(MediaEvent::Status {
            session,
            resource: resource.clone(),
            status,
            result,
        });
    }

    // =========================================================================
    // Start / stop
    // =========================================================================

    /// Stops whatever is running, then starts `resource`.
    ///
    /// Returns once the new session is Active, or as soon as it is clear the
    /// start was superseded by a later start or stop.
    pub async fn start(self: &Arc<Self>, kind: MediaKind, resource: ResourceId, params: Value) {
        let generation = self.claim_generation();
        self.run_start(generation, kind, resource, params).await;
    }

    /// Like [`start`](Self::start) but runs in the background. Supersedes
    /// earlier requests before returning.
    pub fn start_detached(
        self: &Arc<Self>,
        kind: MediaKind,
        resource: ResourceId,
        params: Value,
    ) -> JoinHandle<()> {
        let generation = self.claim_generation();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.run_start(generation, kind, resource, params).await;
        })
    }

    /// Stops everything. Also cancels any start still in flight.
    pub async fn stop(&self) {
        self.claim_generation();
        self.stop_all().await;
    }

    /// Like [`stop`](Self::stop) but runs in the background.
    pub fn stop_detached(self: &Arc<Self>) -> JoinHandle<()> {
        self.claim_generation();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.stop_all().await;
        })
    }

    /// Retires the current session as soon as a newer request exists, so its
    /// late events are no longer current while the request settles.
    fn claim_generation(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.latest = None;
        inner.generation
    }

    async fn run_start(self: &Arc<Self>, generation: u64, kind: MediaKind, resource: ResourceId, params: Value) {
        debug!(%kind, %resource, generation, "Starting media");
        self.stop_all().await;

        let (id, token) = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!(%resource, "Media start superseded before loading");
                return;
            }
            let id = MediaSessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let token = CancellationToken::new();
            inner.current = Some(Current {
                session: MediaSession::loading(id, kind, resource.clone(), self.clock.now()),
                handle: Handle::Pending,
                cancel: token.clone(),
            });
            inner.latest = Some(id);
            (id, token)
        };

        match kind {
            MediaKind::Audio => self.start_audio(id, resource, token).await,
            MediaKind::Minigame => self.start_minigame(id, resource, params, token).await,
        }
    }

    async fn stop_all(&self) {
        let claimed = self.stopping.send_if_modified(|stopping| {
            if *stopping {
                false
            } else {
                *stopping = true;
                true
            }
        });
        if !claimed {
            let mut rx = self.stopping.subscribe();
            let _ = rx.wait_for(|stopping| !*stopping).await;
            return;
        }

        let stopped = {
            let mut inner = self.lock();
            let stopped = inner.teardown_current();
            inner.silence_others(None);
            stopped
        };
        if let Some(session) = stopped {
            debug!(session = %session.id, resource = %session.resource, "Media session stopped");
            if session.kind == MediaKind::Audio {
                self.emit_status(
                    session.id,
                    &session.resource,
                    MediaStatus::Audio(AudioStatus::Stopped),
                    None,
                );
            }
        }

        tokio::time::sleep(self.config.stop_settle).await;
        self.stopping.send_replace(false);
    }

    /// Marks session `id` Active with `handle`, silencing everything else.
    fn activate(&self, id: MediaSessionId, handle: Handle, token: &CancellationToken) -> bool {
        let mut inner = self.lock();
        let ours = inner.current.as_ref().is_some_and(|c| c.session.id == id);
        if token.is_cancelled() || !ours {
            return false;
        }
        let keep = match &handle {
            Handle::Audio(resource) => Some(Arc::clone(resource)),
            _ => None,
        };
        inner.silence_others(keep.as_ref());
        let Some(current) = inner.current_for(id) else {
            return false;
        };
        if !current.session.advance(SessionState::Active) {
            return false;
        }
        current.session.simulated = matches!(handle, Handle::Simulated);
        current.handle = handle;
        true
    }

    /// Ends session `id` on its own terms. No-op if it was stopped meanwhile.
    fn finish(&self, id: MediaSessionId, outcome: SessionOutcome) {
        let (session, kind) = {
            let mut inner = self.lock();
            let matches = inner
                .current
                .as_ref()
                .is_some_and(|c| c.session.id == id && c.session.is_active());
            if !matches {
                return;
            }
            let Some(session) = inner.teardown_current() else {
                return;
            };
            if session.kind == MediaKind::Audio {
                let record = PlaybackRecord {
                    resource: session.resource.clone(),
                    finished_at: self.clock.now(),
                    simulated: session.simulated,
                };
                inner.remember_playback(record);
            }
            let kind = session.kind;
            (session, kind)
        };

        if kind == MediaKind::Audio {
            self.emit_status(id, &session.resource, MediaStatus::Audio(AudioStatus::Finished), None);
        }
        debug!(session = %id, resource = %session.resource, "Media session ended");
        self.emit(MediaEvent::Ended {
            session: id,
            kind,
            outcome,
        });
    }

    // =========================================================================
    // Audio
    // =========================================================================

    async fn start_audio(self: &Arc<Self>, id: MediaSessionId, resource: ResourceId, token: CancellationToken) {
        self.emit_status(id, &resource, MediaStatus::Audio(AudioStatus::Loading), None);

        if !self.config.audio_enabled {
            debug!(%resource, "Audio disabled, using placeholder timing");
            self.run_simulated(id, MediaKind::Audio, resource, token);
            return;
        }

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            opened = self.acquire(&resource) => opened,
        };
        let media = match opened {
            Ok(media) => media,
            Err(e) => {
                warn!(%resource, error = %e, "Narration unavailable, falling back to placeholder");
                self.emit_status(id, &resource, MediaStatus::Audio(AudioStatus::Error), None);
                self.run_simulated(id, MediaKind::Audio, resource, token);
                return;
            }
        };

        {
            let mut inner = self.lock();
            let volume = inner.effective_volume();
            match inner.current_for(id) {
                Some(current) if !token.is_cancelled() => {
                    current.handle = Handle::Audio(Arc::clone(&media));
                }
                _ => return,
            }
            media.set_volume(volume);
        }

        let played = tokio::select! {
            biased;
            _ = token.cancelled() => {
                media.pause();
                media.rewind();
                return;
            }
            played = media.play() => played,
        };
        match played {
            Ok(()) => {}
            Err(PlaybackError::AutoplayBlocked) => {
                info!(%resource, "Autoplay blocked, narration waits for user interaction");
            }
            Err(PlaybackError::Failed(reason)) => {
                if token.is_cancelled() {
                    return;
                }
                warn!(%resource, %reason, "Narration failed to play, falling back to placeholder");
                media.pause();
                self.emit_status(id, &resource, MediaStatus::Audio(AudioStatus::Error), None);
                self.run_simulated(id, MediaKind::Audio, resource, token);
                return;
            }
        }

        if !self.activate(id, Handle::Audio(Arc::clone(&media)), &token) {
            media.pause();
            media.rewind();
            return;
        }
        info!(session = %id, %resource, "Narration playing");
        self.emit_status(id, &resource, MediaStatus::Audio(AudioStatus::Started), None);
        self.emit(MediaEvent::Activated {
            session: id,
            kind: MediaKind::Audio,
        });

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = media.ended() => controller.finish(id, SessionOutcome::Finished),
            }
        });
    }

    /// Cached resource if healthy, otherwise a freshly opened one.
    async fn acquire(&self, resource: &ResourceId) -> Result<Arc<dyn MediaResource>, MediaLoadError> {
        let cached = {
            let mut inner = self.lock();
            match inner.cache.get(resource) {
                Some(media) if media.is_corrupted() => {
                    debug!(%resource, "Evicting corrupted cache entry");
                    inner.cache.remove(resource);
                    inner.untrack(&media);
                    media.release();
                    None
                }
                other => other,
            }
        };
        if let Some(media) = cached {
            media.pause();
            media.rewind();
            return Ok(media);
        }

        let media = self.backend.open(resource).await?;
        let mut inner = self.lock();
        for evicted in inner.cache.insert(Arc::clone(&media)) {
            debug!(resource = %evicted.id(), "Evicting cached media");
            evicted.pause();
            evicted.release();
            inner.untrack(&evicted);
        }
        inner.tracked.push(Arc::clone(&media));
        Ok(media)
    }

    // =========================================================================
    // Minigames
    // =========================================================================

    async fn start_minigame(
        self: &Arc<Self>,
        id: MediaSessionId,
        resource: ResourceId,
        params: Value,
        token: CancellationToken,
    ) {
        if !self.config.minigames_enabled {
            debug!(%resource, "Minigames disabled, simulating");
            self.run_simulated(id, MediaKind::Minigame, resource, token);
            return;
        }

        let loaded = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            loaded = tokio::time::timeout(
                self.config.minigame_load_timeout,
                self.minigames.load(&resource, &params),
            ) => loaded,
        };
        let link = match loaded {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                warn!(%resource, error = %e, "Minigame failed to load, simulating");
                self.minigame_load_failed(id, resource, token, e.to_string());
                return;
            }
            Err(_) => {
                warn!(
                    %resource,
                    timeout_ms = self.config.minigame_load_timeout.as_millis() as u64,
                    "Minigame load timed out, simulating"
                );
                self.minigame_load_failed(id, resource, token, "load timed out".to_string());
                return;
            }
        };

        let MinigameLink { instance, signals } = link;
        if !self.activate(id, Handle::Minigame(Arc::clone(&instance)), &token) {
            instance.unload();
            return;
        }
        instance.send(MinigameCommand::Initialize { game_data: params });
        info!(session = %id, %resource, "Minigame running");
        self.emit_status(id, &resource, MediaStatus::Minigame(MinigameStatus::Started), None);
        self.emit(MediaEvent::Activated {
            session: id,
            kind: MediaKind::Minigame,
        });

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.watch_minigame(id, resource, signals, token).await;
        });
    }

    fn minigame_load_failed(
        self: &Arc<Self>,
        id: MediaSessionId,
        resource: ResourceId,
        token: CancellationToken,
        reason: String,
    ) {
        if token.is_cancelled() {
            return;
        }
        self.emit_status(
            id,
            &resource,
            MediaStatus::Minigame(MinigameStatus::Error),
            Some(json!({ "error": reason })),
        );
        self.run_simulated(id, MediaKind::Minigame, resource, token);
    }

    async fn watch_minigame(
        self: Arc<Self>,
        id: MediaSessionId,
        resource: ResourceId,
        mut signals: mpsc::UnboundedReceiver<MinigameSignal>,
        token: CancellationToken,
    ) {
        loop {
            let signal = tokio::select! {
                _ = token.cancelled() => return,
                signal = signals.recv() => signal,
            };
            let outcome = match signal {
                Some(MinigameSignal::Progress(progress)) => {
                    self.emit_status(
                        id,
                        &resource,
                        MediaStatus::Minigame(MinigameStatus::Progress),
                        Some(progress),
                    );
                    continue;
                }
                Some(MinigameSignal::Completed(result)) => SessionOutcome::MinigameCompleted(result),
                Some(MinigameSignal::Failed(result)) => SessionOutcome::MinigameFailed(result),
                None => {
                    warn!(%resource, "Minigame went away without a result");
                    SessionOutcome::MinigameFailed(json!({ "error": "minigame disconnected" }))
                }
            };
            self.conclude_minigame(id, &resource, outcome, &token).await;
            return;
        }
    }

    /// Reports the result, waits the return delay, then ends the session.
    async fn conclude_minigame(
        &self,
        id: MediaSessionId,
        resource: &ResourceId,
        outcome: SessionOutcome,
        token: &CancellationToken,
    ) {
        let (status, result) = match &outcome {
            SessionOutcome::MinigameCompleted(result) => (MinigameStatus::Completed, result.clone()),
            SessionOutcome::MinigameFailed(result) => (MinigameStatus::Failed, result.clone()),
            SessionOutcome::Finished => return,
        };
        info!(session = %id, %resource, ?status, "Minigame finished");
        {
            let mut inner = self.lock();
            let record = MinigameRecord {
                minigame: minigame_id_of(resource),
                status,
                result: result.clone(),
                at: self.clock.now(),
            };
            inner.remember_minigame(record);
        }
        self.emit_status(id, resource, MediaStatus::Minigame(status), Some(result));

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(self.config.minigame_return_delay) => {}
        }
        self.finish(id, outcome);
    }

    /// Forwards raw input to the running minigame. False when none runs.
    pub fn forward_input(&self, input: &str) -> bool {
        let inner = self.lock();
        let Some(current) = inner.current.as_ref().filter(|c| c.session.is_active()) else {
            return false;
        };
        match (&current.handle, current.session.kind) {
            (Handle::Minigame(instance), _) => {
                instance.send(MinigameCommand::Input {
                    input: input.to_string(),
                });
                true
            }
            (Handle::Simulated, MediaKind::Minigame) => {
                debug!(input, "Simulated minigame ignoring input");
                true
            }
            _ => false,
        }
    }

    /// Clears the minigame host container.
    pub fn unload_minigame(&self) -> Result<(), MinigameUnloadError> {
        self.minigames.unload_all()
    }

    // =========================================================================
    // Placeholder sessions
    // =========================================================================

    fn run_simulated(self: &Arc<Self>, id: MediaSessionId, kind: MediaKind, resource: ResourceId, token: CancellationToken) {
        if !self.activate(id, Handle::Simulated, &token) {
            return;
        }
        let (duration, status, detail) = match kind {
            MediaKind::Audio => (
                self.config.placeholder_audio,
                MediaStatus::Audio(AudioStatus::Started),
                None,
            ),
            MediaKind::Minigame => (
                self.config.placeholder_minigame,
                MediaStatus::Minigame(MinigameStatus::Started),
                Some(json!({ "simulated": true })),
            ),
        };
        info!(session = %id, %resource, duration_ms = duration.as_millis() as u64, "Running placeholder {kind}");
        self.emit_status(id, &resource, status, detail);
        self.emit(MediaEvent::Activated { session: id, kind });

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    match kind {
                        MediaKind::Audio => controller.finish(id, SessionOutcome::Finished),
                        MediaKind::Minigame => {
                            let outcome = controller.simulated_outcome(duration);
                            controller.conclude_minigame(id, &resource, outcome, &token).await;
                        }
                    }
                }
            }
        });
    }

    fn simulated_outcome(&self, played_for: Duration) -> SessionOutcome {
        let success = self.random.gen_range(1, 100) <= SIMULATED_SUCCESS_PERCENT;
        let result = json!({
            "success": success,
            "score": if success { self.random.gen_range(100, 999) } else { self.random.gen_range(0, 99) },
            "completionTime": played_for.as_millis() as u64,
            "simulated": true,
        });
        if success {
            SessionOutcome::MinigameCompleted(result)
        } else {
            SessionOutcome::MinigameFailed(result)
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_active(&self) -> bool {
        self.lock()
            .current
            .as_ref()
            .is_some_and(|c| c.session.is_active())
    }

    /// No session Active or stopping and no resource anywhere still playing.
    pub fn is_fully_stopped(&self) -> bool {
        let inner = self.lock();
        let session_idle = inner
            .current
            .as_ref()
            .map_or(true, |c| matches!(c.session.state, SessionState::Loading | SessionState::Stopped));
        session_idle
            && !inner.cache.iter().any(|r| r.is_playing())
            && !inner.tracked.iter().any(|r| r.is_playing())
    }

    /// Whether events from `session` still matter.
    pub fn is_current(&self, session: MediaSessionId) -> bool {
        self.lock().latest == Some(session)
    }

    pub fn current_session(&self) -> Option<MediaSession> {
        self.lock().current.as_ref().map(|c| c.session.clone())
    }

    pub fn stats(&self) -> MediaStats {
        let inner = self.lock();
        MediaStats {
            current: inner.current.as_ref().map(|c| c.session.clone()),
            cached: inner.cache.len(),
            tracked: inner.tracked.len(),
            playing: inner.tracked.iter().filter(|r| r.is_playing()).count(),
            volume: inner.volume,
            muted: inner.muted,
        }
    }

    pub fn playback_history(&self) -> Vec<PlaybackRecord> {
        self.lock().playback_history.iter().cloned().collect()
    }

    pub fn minigame_history(&self) -> Vec<MinigameRecord> {
        self.lock().minigame_history.iter().cloned().collect()
    }

    // =========================================================================
    // Extras
    // =========================================================================

    /// Opens `resource` ahead of time so a later start skips loading.
    pub async fn preload(&self, resource: &ResourceId) -> Result<(), MediaLoadError> {
        if !self.config.audio_enabled {
            return Ok(());
        }
        self.acquire(resource).await.map(|_| ())
    }

    pub fn set_volume(&self, volume: f32) {
        let mut inner = self.lock();
        inner.volume = volume.clamp(0.0, 1.0);
        self.apply_volume(&inner);
    }

    /// Returns whether audio is now muted.
    pub fn toggle_mute(&self) -> bool {
        let mut inner = self.lock();
        inner.muted = !inner.muted;
        self.apply_volume(&inner);
        inner.muted
    }

    fn apply_volume(&self, inner: &Inner) {
        let volume = inner.effective_volume();
        if let Some(Current {
            handle: Handle::Audio(resource),
            ..
        }) = inner.current.as_ref()
        {
            resource.set_volume(volume);
        }
    }

    /// Stops everything and releases every cached resource.
    pub async fn clear_cache(&self) {
        self.stop().await;
        let mut inner = self.lock();
        for resource in inner.cache.drain() {
            resource.release();
        }
        for resource in inner.tracked.drain(..) {
            resource.release();
        }
        debug!("Media cache cleared");
    }
}
