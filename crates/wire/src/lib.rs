//! Draughts socket wire format
//!
//! This crate contains the types exchanged with the site's real-time endpoint:
//! - Envelopes (`{t, d?, v?}`) and batches (`{t: "b", d: [...]}`)
//! - Inbound frame parsing, including the bare pong frame
//! - Typed classification of the inbound event types the client reacts to
//! - Outbound encoding helpers (ping frames, reserved payload fields)
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json, and thiserror
//! 2. **No connection logic** - Pure data types and serialization

pub mod envelope;
pub mod error;
pub mod event;
pub mod frame;
pub mod outbound;

pub use envelope::Envelope;
pub use error::WireError;
pub use event::ServerEvent;
pub use frame::{parse_frame, InboundFrame};
pub use outbound::{encode_millis, ping_frame, reserved, PING_FRAME};
