//! Event fan-out and connection state observation.
//!
//! - `EventBus`: topic-keyed publish/subscribe shared with the application
//! - `SocketObserver`: read-only view of the socket's state, lag and version

pub mod connection;
pub mod event_bus;

pub(crate) use connection::StatusCell;
pub use connection::{ConnectionState, SocketObserver, SocketStatus};
pub use event_bus::{topics, EventBus, Subscriber};
