//! Inbound frame decoding.

use crate::envelope::Envelope;
use crate::error::WireError;

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Bare pong: a zero-length frame or the literal text `0`
    Pong,
    /// `{t: "b", d: [...]}`, unpacked in order
    Batch(Vec<Envelope>),
    Single(Envelope),
}

/// Decode one text frame received from the server.
pub fn parse_frame(text: &str) -> Result<InboundFrame, WireError> {
    if text.is_empty() || text == "0" {
        return Ok(InboundFrame::Pong);
    }

    let envelope: Envelope = serde_json::from_str(text)?;
    if !envelope.is_batch() {
        return Ok(InboundFrame::Single(envelope));
    }

    match envelope.data {
        Some(serde_json::Value::Array(items)) => {
            let batch = items
                .into_iter()
                .map(serde_json::from_value::<Envelope>)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(InboundFrame::Batch(batch))
        }
        Some(other) => Err(WireError::invalid_batch(format!(
            "expected an array, got {}",
            other
        ))),
        None => Err(WireError::invalid_batch("missing payload")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_pong_frames() {
        assert_eq!(parse_frame("").expect("parse"), InboundFrame::Pong);
        assert_eq!(parse_frame("0").expect("parse"), InboundFrame::Pong);
    }

    #[test]
    fn test_single_envelope() {
        let frame = parse_frame(r#"{"t":"x","d":{},"v":6}"#).expect("parse");
        assert_eq!(
            frame,
            InboundFrame::Single(Envelope::new("x").with_data(json!({})).with_version(6))
        );
    }

    #[test]
    fn test_batch_preserves_order() {
        let frame = parse_frame(r#"{"t":"b","d":[{"t":"a","v":1},{"t":"c","v":2}]}"#)
            .expect("parse");
        let InboundFrame::Batch(items) = frame else {
            panic!("expected batch, got {:?}", frame);
        };
        let kinds: Vec<_> = items.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["a", "c"]);
        assert_eq!(items[1].version, Some(2));
    }

    #[test]
    fn test_batch_without_array_is_rejected() {
        assert!(matches!(
            parse_frame(r#"{"t":"b","d":{"t":"a"}}"#),
            Err(WireError::InvalidBatch(_))
        ));
        assert!(matches!(
            parse_frame(r#"{"t":"b"}"#),
            Err(WireError::InvalidBatch(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(parse_frame("{not json"), Err(WireError::Malformed(_))));
    }
}
