//! Connection state observation.
//!
//! The socket task owns all mutable state. It mirrors a snapshot of it into a
//! shared cell after every transition so the application can read the current
//! state, lag and version without going through the task.

use std::sync::{Arc, RwLock};

/// Connection state of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected and not trying to
    #[default]
    Disconnected,
    /// Attempting to establish connection
    Connecting,
    /// Successfully connected
    Connected,
    /// Connection lost, a reconnect is scheduled
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }

    /// Whether the application should show the "offline" indicator.
    pub fn is_offline(self) -> bool {
        self != ConnectionState::Connected
    }
}

/// Point-in-time view of a socket.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SocketStatus {
    pub state: ConnectionState,
    /// Smoothed round-trip time in milliseconds
    pub average_lag: f64,
    /// Ping delay + idle bonus + average lag, in milliseconds
    pub ping_interval: f64,
    pub version: Option<u64>,
    pub connect_count: u32,
    pub idle: bool,
    pub pending_acks: usize,
}

/// Write side, held by the socket core.
#[derive(Clone, Default)]
pub(crate) struct StatusCell {
    inner: Arc<RwLock<SocketStatus>>,
}

impl StatusCell {
    pub(crate) fn store(&self, status: SocketStatus) {
        match self.inner.write() {
            Ok(mut guard) => *guard = status,
            Err(e) => tracing::error!("Failed to acquire write lock for socket status: {}", e),
        }
    }

    pub(crate) fn observer(&self) -> SocketObserver {
        SocketObserver {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Observable socket status for UI binding.
///
/// Cheap to clone; every clone reads the same underlying snapshot.
#[derive(Clone)]
pub struct SocketObserver {
    inner: Arc<RwLock<SocketStatus>>,
}

impl SocketObserver {
    /// Latest snapshot.
    pub fn snapshot(&self) -> SocketStatus {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn average_lag(&self) -> f64 {
        self.snapshot().average_lag
    }

    pub fn ping_interval(&self) -> f64 {
        self.snapshot().ping_interval
    }

    pub fn version(&self) -> Option<u64> {
        self.snapshot().version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_reads_latest_snapshot() {
        let cell = StatusCell::default();
        let observer = cell.observer();

        assert_eq!(observer.state(), ConnectionState::Disconnected);
        assert!(!observer.is_connected());

        cell.store(SocketStatus {
            state: ConnectionState::Connected,
            average_lag: 42.5,
            version: Some(7),
            ..SocketStatus::default()
        });

        assert!(observer.is_connected());
        assert_eq!(observer.average_lag(), 42.5);
        assert_eq!(observer.version(), Some(7));
    }

    #[test]
    fn test_offline_states() {
        assert!(ConnectionState::Reconnecting.is_offline());
        assert!(ConnectionState::Connecting.is_offline());
        assert!(!ConnectionState::Connected.is_offline());
        assert_eq!(ConnectionState::Reconnecting.as_str(), "reconnecting");
    }
}
