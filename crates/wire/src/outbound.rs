//! Client-to-server encoding helpers.

use serde_json::json;

/// Reserved payload fields the client writes into `d`.
pub mod reserved {
    /// Ack id of an ackable message
    pub const ACK_ID: &str = "a";
    /// Smoothed lag in milliseconds
    pub const LAG: &str = "l";
    /// Base-36 tenths of a second, see [`super::encode_millis`]
    pub const MILLIS: &str = "s";
}

/// Plain ping frame.
pub const PING_FRAME: &str = "null";

/// Ping frame, optionally reporting the client's average lag divided by ten.
pub fn ping_frame(reported_lag: Option<u64>) -> String {
    match reported_lag {
        Some(lag) => json!({ "t": "p", "l": lag }).to_string(),
        None => PING_FRAME.to_string(),
    }
}

/// Compact timestamp: milliseconds rounded to tenths of a second, base 36.
///
/// Returns `None` for negative or non-finite input.
pub fn encode_millis(millis: f64) -> Option<String> {
    if !millis.is_finite() || millis < 0.0 {
        return None;
    }
    let mut value = (millis * 0.1).round() as u64;
    if value == 0 {
        return Some("0".to_string());
    }

    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_frames() {
        assert_eq!(ping_frame(None), "null");
        let reported: serde_json::Value =
            serde_json::from_str(&ping_frame(Some(12))).expect("json");
        assert_eq!(reported, json!({"t": "p", "l": 12}));
    }

    #[test]
    fn test_encode_millis() {
        assert_eq!(encode_millis(0.0).as_deref(), Some("0"));
        assert_eq!(encode_millis(4.0).as_deref(), Some("0"));
        assert_eq!(encode_millis(350.0).as_deref(), Some("z"));
        assert_eq!(encode_millis(360.0).as_deref(), Some("10"));
        assert_eq!(encode_millis(123_456.0).as_deref(), Some("9iy"));
        assert_eq!(encode_millis(-1.0), None);
        assert_eq!(encode_millis(f64::NAN), None);
    }
}
