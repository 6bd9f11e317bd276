//! One-shot timer scheduling.
//!
//! The core never sleeps. It asks the scheduler to hand a [`Timer`] back after
//! a delay, and the runtime feeds fired timers into the core together with
//! their [`TimerHandle`]. A handle the core no longer tracks is ignored, which
//! makes cancellation race-free even when a timer fires while being cancelled.

use std::time::Duration;

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// What a fired timer means to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Time to send the next ping
    Ping,
    /// Connection watchdog / scheduled reconnect
    Connect,
    /// Periodic resend of unacknowledged messages
    AckSweep,
    /// Second and last attempt at a failed send
    RetrySend,
    /// Check whether the user went idle
    IdleCheck,
    /// Idle for too long, tear the socket down
    IdleDisconnect,
}

pub trait Scheduler: Send {
    fn schedule_once(&mut self, delay: Duration, timer: Timer) -> TimerHandle;

    /// Cancel a timer. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}
