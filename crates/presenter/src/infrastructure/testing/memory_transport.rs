//! In-memory pub/sub broker for tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ports::outbound::{PubSubTransport, TransportError, TransportEvent};

#[derive(Default)]
struct BrokerState {
    link: Option<mpsc::UnboundedSender<TransportEvent>>,
    refused: HashSet<String>,
    silent: HashSet<String>,
    connect_attempts: Vec<String>,
    subscribe_failures: u32,
    subscriptions: Vec<String>,
    published: Vec<(String, String)>,
}

/// A transport whose broker lives in memory.
///
/// Clones share the broker, so a test keeps one clone to drive and inspect
/// what the channel adapter does with the other.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse connections to `url` from now on.
    pub fn refuse(&self, url: &str) {
        self.lock().refused.insert(url.to_string());
    }

    pub fn accept(&self, url: &str) {
        let mut state = self.lock();
        state.refused.remove(url);
        state.silent.remove(url);
    }

    /// Connections to `url` never complete.
    pub fn hang(&self, url: &str) {
        self.lock().silent.insert(url.to_string());
    }

    pub fn fail_next_subscribes(&self, count: u32) {
        self.lock().subscribe_failures = count;
    }

    /// Delivers `payload` on the open link. Returns false when there is none.
    pub fn inject(&self, payload: &str) -> bool {
        let state = self.lock();
        let Some(link) = state.link.as_ref() else {
            return false;
        };
        let topic = state.subscriptions.first().cloned().unwrap_or_default();
        link.send(TransportEvent::Message {
            topic,
            payload: payload.to_string(),
        })
        .is_ok()
    }

    /// Closes the open link as if the broker went away.
    pub fn drop_link(&self, reason: &str) {
        let mut state = self.lock();
        if let Some(link) = state.link.take() {
            let _ = link.send(TransportEvent::Closed {
                reason: reason.to_string(),
            });
        }
    }

    pub fn is_linked(&self) -> bool {
        self.lock().link.is_some()
    }

    pub fn connect_attempts(&self) -> Vec<String> {
        self.lock().connect_attempts.clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.lock().subscriptions.clone()
    }

    /// Published payloads in publish order.
    pub fn published(&self) -> Vec<String> {
        self.lock()
            .published
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// `type` of every published payload.
    pub fn published_types(&self) -> Vec<String> {
        self.published()
            .iter()
            .filter_map(|payload| serde_json::from_str::<serde_json::Value>(payload).ok())
            .filter_map(|value| value["type"].as_str().map(str::to_string))
            .collect()
    }

    pub async fn wait_for_published(
        &self,
        count: usize,
        within: Duration,
    ) -> Result<Vec<String>, tokio::time::error::Elapsed> {
        tokio::time::timeout(within, async {
            loop {
                let published = self.published();
                if published.len() >= count {
                    return published;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
    }

    pub async fn wait_for_subscriptions(
        &self,
        count: usize,
        within: Duration,
    ) -> Result<(), tokio::time::error::Elapsed> {
        tokio::time::timeout(within, async {
            while self.subscriptions().len() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
    }
}

#[async_trait]
impl PubSubTransport for MemoryTransport {
    async fn connect(
        &self,
        url: &str,
        _client_id: &str,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        let silent = {
            let mut state = self.lock();
            state.connect_attempts.push(url.to_string());
            if state.refused.contains(url) {
                return Err(TransportError::Unreachable(url.to_string()));
            }
            state.silent.contains(url)
        };
        if silent {
            std::future::pending::<()>().await;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        state.link = Some(tx);
        state.subscriptions.clear();
        Ok(rx)
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.link.is_none() {
            return Err(TransportError::NotConnected);
        }
        if state.subscribe_failures > 0 {
            state.subscribe_failures -= 1;
            return Err(TransportError::SubscribeRejected {
                topic: topic.to_string(),
                reason: "broker busy".to_string(),
            });
        }
        state.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.link.is_none() {
            return Err(TransportError::NotConnected);
        }
        state.published.push((topic.to_string(), payload));
        Ok(())
    }

    async fn disconnect(&self) {
        self.lock().link = None;
    }
}
