//! Connection lifecycle observation.
//!
//! The channel adapter owns the sending side of a `watch` channel; every other
//! component reads connection state through a [`ConnectionStateObserver`].

use std::fmt;

use tokio::sync::watch;

/// Connection state of the message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the broker
    #[default]
    Disconnected,
    /// Attempting to establish connection
    Connecting,
    /// Successfully connected
    Connected,
    /// Connection lost, attempting to reconnect
    Reconnecting,
    /// Reconnection given up (max attempts exceeded). Terminal.
    Failed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the channel published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Reconnect attempts since the last successful connect
    pub reconnect_attempts: u32,
    /// Envelopes waiting for a connection
    pub queued: usize,
}

/// Observable connection state.
///
/// Cheap to clone; every clone sees the same underlying status.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    status: watch::Receiver<ChannelStatus>,
    last_state: ConnectionState,
    client_id: String,
}

impl ConnectionStateObserver {
    pub fn new(status: watch::Receiver<ChannelStatus>, client_id: impl Into<String>) -> Self {
        let last_state = status.borrow().state;
        Self {
            status,
            last_state,
            client_id: client_id.into(),
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Waits for the next state change and returns the new state.
    ///
    /// Compares against the last state this observer handed out, so a change
    /// that landed between calls is reported rather than lost. Returns `None`
    /// once the channel task has gone away.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        loop {
            let current = self.status.borrow_and_update().state;
            if current != self.last_state {
                self.last_state = current;
                return Some(current);
            }
            self.status.changed().await.ok()?;
        }
    }

    /// Waits for the next status update of any kind.
    ///
    /// Cancel-safe: an update that lands while the caller is busy elsewhere
    /// is returned by the next call.
    pub async fn next_status(&mut self) -> Option<ChannelStatus> {
        self.status.changed().await.ok()?;
        let status = self.status.borrow_and_update().clone();
        self.last_state = status.state;
        Some(status)
    }

    /// Waits until the channel reaches `state`.
    pub async fn wait_for(&mut self, state: ConnectionState) -> bool {
        self.status.wait_for(|s| s.state == state).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[test]
    fn test_observer_reads_state() {
        let (tx, rx) = watch::channel(ChannelStatus::default());
        let observer = ConnectionStateObserver::new(rx, "presenter-1");

        assert_eq!(observer.state(), ConnectionState::Disconnected);
        assert!(!observer.is_connected());

        tx.send_modify(|s| s.state = ConnectionState::Connected);

        assert_eq!(observer.state(), ConnectionState::Connected);
        assert!(observer.is_connected());
        assert_eq!(observer.client_id(), "presenter-1");
    }

    const WITHIN: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn changed_skips_updates_that_keep_the_state() {
        let (tx, rx) = watch::channel(ChannelStatus::default());
        let mut observer = ConnectionStateObserver::new(rx, "presenter-1");

        tx.send_modify(|s| s.queued = 3);
        tx.send_modify(|s| s.state = ConnectionState::Connecting);

        let changed = timeout(WITHIN, observer.changed()).await;
        assert_eq!(changed.ok(), Some(Some(ConnectionState::Connecting)));

        drop(tx);
        let closed = timeout(WITHIN, observer.changed()).await;
        assert_eq!(closed.ok(), Some(None));
    }

    #[tokio::test]
    async fn changed_reports_a_change_that_landed_before_the_call() {
        let (tx, rx) = watch::channel(ChannelStatus::default());
        let mut observer = ConnectionStateObserver::new(rx, "presenter-1");

        tx.send_modify(|s| s.state = ConnectionState::Connecting);
        tokio::task::yield_now().await;

        let changed = timeout(WITHIN, observer.changed()).await;
        assert_eq!(changed.ok(), Some(Some(ConnectionState::Connecting)));

        tx.send_modify(|s| s.state = ConnectionState::Connected);
        let changed = timeout(WITHIN, observer.changed()).await;
        assert_eq!(changed.ok(), Some(Some(ConnectionState::Connected)));
    }

    #[tokio::test]
    async fn changed_waits_while_the_state_holds() {
        let (tx, rx) = watch::channel(ChannelStatus::default());
        let mut observer = ConnectionStateObserver::new(rx, "presenter-1");

        tx.send_modify(|s| s.queued = 1);

        let changed = timeout(Duration::from_millis(30), observer.changed()).await;
        assert!(changed.is_err());
    }
}
