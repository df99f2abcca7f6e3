//! Minigame host driven by the test instead of a bundle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use whiskers_domain::ResourceId;

use crate::ports::outbound::{
    MinigameCommand, MinigameHost, MinigameInstance, MinigameLink, MinigameLoadError,
    MinigameSignal, MinigameUnloadError,
};

#[derive(Default)]
struct HostState {
    loads: Vec<(ResourceId, Value)>,
    load_failure: Option<MinigameLoadError>,
    hang: bool,
    signals: Option<mpsc::UnboundedSender<MinigameSignal>>,
    commands: Vec<MinigameCommand>,
    unloads: u32,
    unload_all_calls: u32,
    unload_all_failure: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeMinigameHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeMinigameHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_loads(&self, error: MinigameLoadError) {
        self.lock().load_failure = Some(error);
    }

    /// Loads never complete.
    pub fn hang_loads(&self) {
        self.lock().hang = true;
    }

    pub fn fail_unload_all(&self, reason: &str) {
        self.lock().unload_all_failure = Some(reason.to_string());
    }

    /// Sends `signal` from the loaded minigame. False when none is loaded.
    pub fn emit(&self, signal: MinigameSignal) -> bool {
        self.lock()
            .signals
            .as_ref()
            .is_some_and(|tx| tx.send(signal).is_ok())
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().signals.is_some()
    }

    pub fn loads(&self) -> Vec<ResourceId> {
        self.lock().loads.iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn commands(&self) -> Vec<MinigameCommand> {
        self.lock().commands.clone()
    }

    pub fn unloads(&self) -> u32 {
        self.lock().unloads
    }

    pub fn unload_all_calls(&self) -> u32 {
        self.lock().unload_all_calls
    }
}

struct FakeInstance {
    host: FakeMinigameHost,
    unloaded: AtomicBool,
}

impl MinigameInstance for FakeInstance {
    fn send(&self, command: MinigameCommand) {
        if !self.unloaded.load(Ordering::SeqCst) {
            self.host.lock().commands.push(command);
        }
    }

    fn unload(&self) {
        if !self.unloaded.swap(true, Ordering::SeqCst) {
            let mut state = self.host.lock();
            state.unloads += 1;
            state.signals = None;
        }
    }
}

#[async_trait]
impl MinigameHost for FakeMinigameHost {
    async fn load(&self, resource: &ResourceId, params: &Value) -> Result<MinigameLink, MinigameLoadError> {
        let hang = {
            let mut state = self.lock();
            state.loads.push((resource.clone(), params.clone()));
            if let Some(error) = state.load_failure.clone() {
                return Err(error);
            }
            state.hang
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().signals = Some(tx);
        Ok(MinigameLink {
            instance: Arc::new(FakeInstance {
                host: self.clone(),
                unloaded: AtomicBool::new(false),
            }),
            signals: rx,
        })
    }

    fn unload_all(&self) -> Result<(), MinigameUnloadError> {
        let mut state = self.lock();
        state.unload_all_calls += 1;
        if let Some(reason) = state.unload_all_failure.clone() {
            return Err(MinigameUnloadError(reason));
        }
        state.signals = None;
        Ok(())
    }
}
