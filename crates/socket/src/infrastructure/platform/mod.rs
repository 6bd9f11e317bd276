//! Platform-specific implementations of the ports in
//! `crate::ports::outbound::platform`.

mod desktop;
mod memory;

pub use desktop::{DesktopRandomProvider, DesktopStorageProvider, SystemClock};
pub use memory::MemoryStorage;
