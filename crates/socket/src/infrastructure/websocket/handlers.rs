//! Per-socket application handlers.
//!
//! Every inbound event that the socket does not consume itself goes first to
//! the `receive` callback; if that does not claim it, to the handler
//! registered for its type.

use std::collections::HashMap;

use serde_json::Value;

use draughts_socket_wire::Envelope;

/// `(type, data) -> handled`. Returning `true` suppresses the events table.
pub type ReceiveFn = Box<dyn FnMut(&str, &Value) -> bool + Send + 'static>;

/// `(data, envelope)`. `data` is `null` when the event carried none.
pub type EventFn = Box<dyn FnMut(&Value, &Envelope) + Send + 'static>;

#[derive(Default)]
pub struct SocketHandlers {
    receive: Option<ReceiveFn>,
    events: HashMap<String, EventFn>,
}

impl SocketHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_receive(
        mut self,
        receive: impl FnMut(&str, &Value) -> bool + Send + 'static,
    ) -> Self {
        self.receive = Some(Box::new(receive));
        self
    }

    /// Register the handler for one event type, replacing any previous one.
    pub fn on(
        mut self,
        kind: impl Into<String>,
        handler: impl FnMut(&Value, &Envelope) + Send + 'static,
    ) -> Self {
        self.events.insert(kind.into(), Box::new(handler));
        self
    }

    /// Run `receive`, then the typed handler unless `receive` claimed it.
    ///
    /// Returns true if any application code saw the event.
    pub(crate) fn dispatch(&mut self, kind: &str, data: &Value, envelope: &Envelope) -> bool {
        let claimed = match self.receive.as_mut() {
            Some(receive) => receive(kind, data),
            None => false,
        };
        if claimed {
            return true;
        }
        match self.events.get_mut(kind) {
            Some(handler) => {
                handler(data, envelope);
                true
            }
            None => self.receive.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_receive_claims_event() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let hits_receive = Arc::clone(&hits);
        let hits_event = Arc::clone(&hits);

        let mut handlers = SocketHandlers::new()
            .with_receive(move |kind, _| {
                hits_receive.lock().expect("lock").push(format!("receive:{}", kind));
                kind == "reload"
            })
            .on("reload", move |_, _| {
                hits_event.lock().expect("lock").push("event:reload".to_string());
            });

        let env = Envelope::new("reload");
        assert!(handlers.dispatch("reload", &Value::Null, &env));
        assert_eq!(*hits.lock().expect("lock"), vec!["receive:reload"]);
    }

    #[test]
    fn test_events_table_runs_when_unclaimed() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let mut handlers = SocketHandlers::new()
            .with_receive(|_, _| false)
            .on("crowd", move |data, envelope| {
                *seen_clone.lock().expect("lock") = Some((data.clone(), envelope.version));
            });

        let env = Envelope::new("crowd").with_data(json!({"nb": 4})).with_version(9);
        assert!(handlers.dispatch("crowd", &json!({"nb": 4}), &env));
        assert_eq!(*seen.lock().expect("lock"), Some((json!({"nb": 4}), Some(9))));
    }

    #[test]
    fn test_unhandled_event() {
        let mut handlers = SocketHandlers::new();
        let env = Envelope::new("fen");
        assert!(!handlers.dispatch("fen", &Value::Null, &env));
    }
}
