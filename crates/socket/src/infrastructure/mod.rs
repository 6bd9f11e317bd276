//! Infrastructure: the socket state machine and the adapters it runs on.

pub mod messaging;
pub mod platform;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
