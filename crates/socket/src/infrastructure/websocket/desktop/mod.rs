//! Desktop adapters: tokio timers and a tokio-tungstenite WebSocket

mod scheduler;
mod transport;

pub use scheduler::TokioScheduler;
pub use transport::TungsteniteTransport;
