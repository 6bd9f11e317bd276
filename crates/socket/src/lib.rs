//! Draughts socket client.
//!
//! A resilient, versioned, ack-based WebSocket client. The connection state
//! machine (`SocketCore`) is runtime-free; `create_socket` runs it on tokio
//! with a tokio-tungstenite transport.

pub mod config;
pub mod infrastructure;
pub mod ports;

pub use config::{ConfigError, SocketOptions, SocketSettings};
pub use infrastructure::messaging::{topics, ConnectionState, EventBus, SocketObserver, SocketStatus};
pub use infrastructure::platform::{DesktopStorageProvider, MemoryStorage};
pub use infrastructure::websocket::{
    create_socket, ResyncReason, SendOptions, Socket, SocketCore, SocketHandle, SocketHandlers,
    SocketPorts,
};
