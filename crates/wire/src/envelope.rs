//! The envelope wrapping every JSON message on the socket.
//!
//! Field names are single letters on the wire:
//! - `t`: event type
//! - `d`: optional payload
//! - `v`: optional event version (server-to-client only)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WireError;

/// Event type of a batch envelope.
pub const BATCH_TYPE: &str = "b";

/// Event type the server uses as an in-band pong.
pub const PONG_TYPE: &str = "n";

/// A single message on the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event type. Empty when the server omitted it.
    #[serde(rename = "t", default)]
    pub kind: String,
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: None,
            version: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Version used for ordering. A zero version counts as absent.
    pub fn tracked_version(&self) -> Option<u64> {
        self.version.filter(|v| *v > 0)
    }

    pub fn is_batch(&self) -> bool {
        self.kind == BATCH_TYPE
    }

    pub fn is_pong(&self) -> bool {
        self.kind == PONG_TYPE
    }

    /// Payload, or JSON `null` when absent.
    pub fn data_or_null(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.data.as_ref().unwrap_or(&NULL)
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_omits_absent_fields() {
        let env = Envelope::new("moveLat");
        assert_eq!(env.to_json().expect("serialize"), r#"{"t":"moveLat"}"#);

        let env = Envelope::new("move").with_data(json!({"u": "a1b2"}));
        assert_eq!(
            env.to_json().expect("serialize"),
            r#"{"t":"move","d":{"u":"a1b2"}}"#
        );
    }

    #[test]
    fn test_deserialize_without_type_or_data() {
        let env: Envelope = serde_json::from_str(r#"{"v":3}"#).expect("parse");
        assert!(env.kind.is_empty());
        assert_eq!(env.data, None);
        assert_eq!(env.tracked_version(), Some(3));
    }

    #[test]
    fn test_zero_version_is_untracked() {
        let env = Envelope::new("fen").with_version(0);
        assert_eq!(env.tracked_version(), None);
    }

    #[test]
    fn test_null_payload_reads_as_absent() {
        let env: Envelope = serde_json::from_str(r#"{"t":"reload","d":null}"#).expect("parse");
        assert_eq!(env.data, None);
        assert_eq!(env.data_or_null(), &Value::Null);
    }
}
