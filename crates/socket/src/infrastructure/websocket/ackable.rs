//! In-flight tracking of messages the server must acknowledge.
//!
//! Runtime-free: the core owns the tracker, feeds it the current time and
//! writes whatever frames it hands back.

use serde_json::{Map, Value};

use draughts_socket_wire::{reserved, Envelope, WireError};

use super::shared::ACK_RESEND_AFTER_MS;

/// A message waiting for its `ack`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAck {
    pub id: u64,
    pub kind: String,
    /// Payload as sent, including the `a` field
    pub payload: Map<String, Value>,
    /// Monotonic millis of the first send; not refreshed by resends
    pub sent_at: u64,
}

impl PendingAck {
    /// The exact frame to (re)send.
    pub fn frame(&self) -> Result<String, WireError> {
        Envelope::new(self.kind.clone())
            .with_data(Value::Object(self.payload.clone()))
            .to_json()
    }

    fn is_overdue(&self, now: u64) -> bool {
        now.saturating_sub(self.sent_at) > ACK_RESEND_AFTER_MS
    }
}

/// Tracks pending ackable messages keyed by ack id.
#[derive(Debug)]
pub struct AckTracker {
    next_id: u64,
    pending: Vec<PendingAck>,
}

impl Default for AckTracker {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: Vec::new(),
        }
    }
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next ack id, write it into `payload.a` and start tracking.
    pub fn register(&mut self, kind: &str, payload: &mut Map<String, Value>, now: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        payload.insert(reserved::ACK_ID.to_string(), Value::from(id));
        self.pending.push(PendingAck {
            id,
            kind: kind.to_string(),
            payload: payload.clone(),
            sent_at: now,
        });
        id
    }

    /// Drop every pending message acknowledged by `id`.
    ///
    /// Returns how many were removed; unknown or repeated ids remove nothing.
    pub fn ack(&mut self, id: u64) -> usize {
        let before = self.pending.len();
        self.pending.retain(|m| m.id != id);
        before - self.pending.len()
    }

    /// Messages unacknowledged for longer than the resend threshold.
    pub fn overdue(&self, now: u64) -> impl Iterator<Item = &PendingAck> {
        self.pending.iter().filter(move |m| m.is_overdue(now))
    }

    pub fn pending(&self) -> &[PendingAck] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_ids_increase_from_one() {
        let mut tracker = AckTracker::new();
        let mut first = object(json!({"u": "a1b2"}));
        let mut second = Map::new();

        assert_eq!(tracker.register("move", &mut first, 0), 1);
        assert_eq!(tracker.register("move", &mut second, 0), 2);
        assert_eq!(first.get("a"), Some(&json!(1)));
        assert_eq!(second.get("a"), Some(&json!(2)));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_ack_is_idempotent() {
        let mut tracker = AckTracker::new();
        tracker.register("move", &mut Map::new(), 0);
        tracker.register("move", &mut Map::new(), 0);

        assert_eq!(tracker.ack(99), 0);
        assert_eq!(tracker.ack(1), 1);
        assert_eq!(tracker.ack(1), 0);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.pending()[0].id, 2);
    }

    #[test]
    fn test_ids_are_not_reused_after_ack() {
        let mut tracker = AckTracker::new();
        tracker.register("move", &mut Map::new(), 0);
        tracker.ack(1);
        assert_eq!(tracker.register("move", &mut Map::new(), 0), 2);
    }

    #[test]
    fn test_overdue_threshold() {
        let mut tracker = AckTracker::new();
        tracker.register("move", &mut Map::new(), 1_000);
        tracker.register("move", &mut Map::new(), 2_000);

        assert_eq!(tracker.overdue(3_500).count(), 0);
        let overdue: Vec<_> = tracker.overdue(3_501).map(|m| m.id).collect();
        assert_eq!(overdue, vec![1]);
        assert_eq!(tracker.overdue(10_000).count(), 2);
    }

    #[test]
    fn test_frame_carries_ack_id() {
        let mut tracker = AckTracker::new();
        let mut payload = object(json!({"u": "a1b2"}));
        tracker.register("move", &mut payload, 0);

        let frame = tracker.pending()[0].frame().expect("frame");
        let parsed: Value = serde_json::from_str(&frame).expect("json");
        assert_eq!(parsed, json!({"t": "move", "d": {"u": "a1b2", "a": 1}}));
    }
}
