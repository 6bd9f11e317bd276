//! Outbound ports: everything the core reaches out to.

pub mod platform;
pub mod scheduler;
pub mod transport;

pub use platform::{storage_keys, Clock, RandomProvider, StorageProvider};
pub use scheduler::{Scheduler, Timer, TimerHandle};
pub use transport::{LinkId, Transport, TransportError, TransportEvent, TransportEventKind};

#[cfg(test)]
pub use platform::MockStorageProvider;
#[cfg(test)]
pub use transport::MockTransport;
