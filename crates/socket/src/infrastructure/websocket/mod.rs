//! WebSocket client: the sans-IO core, its helpers, and the tokio bridge.

mod ackable;
mod base_url;
mod bridge;
mod core;
pub mod desktop;
mod handlers;
mod lag;
pub mod shared;


pub use ackable::{AckTracker, PendingAck};
pub use base_url::BaseUrlSelector;
pub use bridge::{create_socket, Socket, SocketHandle};
pub use self::core::{NextConnectFn, ResyncReason, SendOptions, SocketCore, SocketPorts};
pub use desktop::{TokioScheduler, TungsteniteTransport};
pub use handlers::{EventFn, ReceiveFn, SocketHandlers};
pub use lag::{LagEstimate, MAX_LAG_SAMPLE_MS};
