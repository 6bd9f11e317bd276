//! Typed view over the inbound event types the client handles itself.
//!
//! Unknown types fall through to [`ServerEvent::Other`] and are left to the
//! application.

use serde_json::Value;

use crate::envelope::Envelope;

pub const RESYNC_TYPE: &str = "resync";
pub const ACK_TYPE: &str = "ack";
pub const SIMUL_TV_TYPE: &str = "simultv";

/// Classification of a single (non-batch) envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent<'a> {
    /// No `t` field; only its version matters
    Untyped,
    /// Server asks for a full reload
    Resync,
    /// Acknowledges the ackable message with this id. `None` if the payload
    /// was not an id.
    Ack(Option<u64>),
    /// Presence hint: the watched simul moved to another game
    Redirect(Option<&'a str>),
    Other { kind: &'a str, data: &'a Value },
}

impl<'a> ServerEvent<'a> {
    pub fn classify(envelope: &'a Envelope) -> Self {
        match envelope.kind.as_str() {
            "" => ServerEvent::Untyped,
            RESYNC_TYPE => ServerEvent::Resync,
            ACK_TYPE => ServerEvent::Ack(envelope.data.as_ref().and_then(Value::as_u64)),
            SIMUL_TV_TYPE => {
                ServerEvent::Redirect(envelope.data.as_ref().and_then(Value::as_str))
            }
            kind => ServerEvent::Other {
                kind,
                data: envelope.data_or_null(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_known_types() {
        let ack = Envelope::new("ack").with_data(json!(7));
        assert_eq!(ServerEvent::classify(&ack), ServerEvent::Ack(Some(7)));

        let bad_ack = Envelope::new("ack").with_data(json!("seven"));
        assert_eq!(ServerEvent::classify(&bad_ack), ServerEvent::Ack(None));

        let resync = Envelope::new("resync");
        assert_eq!(ServerEvent::classify(&resync), ServerEvent::Resync);

        let tv = Envelope::new("simultv").with_data(json!("abcdefgh"));
        assert_eq!(
            ServerEvent::classify(&tv),
            ServerEvent::Redirect(Some("abcdefgh"))
        );
    }

    #[test]
    fn test_classify_fallback() {
        let untyped = Envelope::new("");
        assert_eq!(ServerEvent::classify(&untyped), ServerEvent::Untyped);

        let crowd = Envelope::new("crowd").with_data(json!({"nb": 3}));
        match ServerEvent::classify(&crowd) {
            ServerEvent::Other { kind, data } => {
                assert_eq!(kind, "crowd");
                assert_eq!(data, &json!({"nb": 3}));
            }
            other => panic!("unexpected {:?}", other),
        }

        let bare = Envelope::new("reload");
        assert!(matches!(
            ServerEvent::classify(&bare),
            ServerEvent::Other { data: Value::Null, .. }
        ));
    }
}
