//! Testing utilities for the socket core.
//!
//! Contains fakes and a driver harness that are only compiled in test mode
//! or when the "testing" feature is enabled. Nothing here touches real time
//! or the network.

mod fake_transport;
mod fixed_random;
mod harness;
mod virtual_time;

pub use fake_transport::FakeTransport;
pub use fixed_random::FixedRandom;
pub use harness::Harness;
pub use virtual_time::{ManualClock, ManualScheduler, VirtualTime};
