//! Event Bus for fanning socket events out to the application.
//!
//! Topic-keyed publish/subscribe. The socket publishes lifecycle topics
//! (`socket.open`, `socket.lag`, ...) and every inbound event on
//! `socket.in.<type>`; application code subscribes to the topics it cares
//! about. One bus is shared by every socket of a session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

pub type Subscriber = Box<dyn FnMut(&Value) + Send + 'static>;

/// Topics published by the socket.
pub mod topics {
    /// Connection opened. Payload: `{"reconnected": bool}`
    pub const OPEN: &str = "socket.open";
    /// A scheduled reconnect is starting; the socket is offline
    pub const OFFLINE: &str = "socket.offline";
    /// New smoothed lag in milliseconds
    pub const LAG: &str = "socket.lag";
    /// Presence hint: follow the simul to another game. Payload: `{"game": id}`
    pub const REDIRECT: &str = "socket.redirect";
    /// Session state cannot be reconciled locally; the application must reload
    pub const RESYNC: &str = "socket.resync";

    /// Topic carrying every inbound event of the given type.
    pub fn inbound(kind: &str) -> String {
        format!("socket.in.{}", kind)
    }
}

/// Event bus for socket events.
///
/// Handlers run synchronously on the socket task, in subscription order,
/// outside the bus lock. A handler may subscribe or publish from inside its
/// callback; a nested publish to the topic being delivered reaches nobody.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<HashMap<String, Vec<Subscriber>>>>,
}

impl EventBus {
    /// Create a new EventBus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Event bus lock poisoned by a panicking subscriber");
                poisoned.into_inner()
            }
        }
    }

    /// Subscribe to one topic.
    pub fn subscribe(&self, topic: impl Into<String>, callback: impl FnMut(&Value) + Send + 'static) {
        self.lock()
            .entry(topic.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// Publish to every subscriber of `topic`. Returns how many were invoked.
    pub fn publish(&self, topic: &str, payload: &Value) -> usize {
        let Some(mut list) = self.lock().remove(topic) else {
            return 0;
        };
        for subscriber in list.iter_mut() {
            subscriber(payload);
        }
        let invoked = list.len();

        // Subscriptions made during delivery go after the existing ones.
        let mut subscribers = self.lock();
        if let Some(added) = subscribers.remove(topic) {
            list.extend(added);
        }
        subscribers.insert(topic.to_string(), list);
        invoked
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock().get(topic).map_or(0, Vec::len)
    }

    /// Clear all subscribers.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
