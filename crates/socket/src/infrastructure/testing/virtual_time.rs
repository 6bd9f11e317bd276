//! Virtual time for deterministic tests.
//!
//! `ManualClock` and `ManualScheduler` share one `VirtualTime`. Time only
//! moves when a test pops a due timer or sets it explicitly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::ports::outbound::{Clock, Scheduler, Timer, TimerHandle};

#[derive(Debug, Default)]
struct TimeState {
    now: u64,
    next_handle: u64,
    /// `(deadline, handle, timer)`, unordered
    pending: Vec<(u64, TimerHandle, Timer)>,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualTime {
    state: Arc<Mutex<TimeState>>,
}

impl VirtualTime {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> ManualClock {
        ManualClock { time: self.clone() }
    }

    pub fn scheduler(&self) -> ManualScheduler {
        ManualScheduler { time: self.clone() }
    }

    pub fn now(&self) -> u64 {
        self.lock().now
    }

    /// Move the clock forward without firing anything.
    pub fn set_now(&self, now: u64) {
        let mut state = self.lock();
        state.now = state.now.max(now);
    }

    /// Remove the earliest timer due at or before `until` and move the clock
    /// to its deadline. Ties fire in scheduling order.
    pub fn pop_due(&self, until: u64) -> Option<(TimerHandle, Timer)> {
        let mut state = self.lock();
        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (deadline, _, _))| *deadline <= until)
            .min_by_key(|(_, (deadline, handle, _))| (*deadline, *handle))
            .map(|(index, _)| index)?;
        let (deadline, handle, timer) = state.pending.remove(index);
        state.now = state.now.max(deadline);
        Some((handle, timer))
    }

    /// Deadlines of the pending timers of one kind, earliest first.
    pub fn deadlines(&self, timer: Timer) -> Vec<u64> {
        let mut deadlines: Vec<u64> = self
            .lock()
            .pending
            .iter()
            .filter(|(_, _, t)| *t == timer)
            .map(|(deadline, _, _)| *deadline)
            .collect();
        deadlines.sort_unstable();
        deadlines
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

#[derive(Debug, Clone)]
pub struct ManualClock {
    time: VirtualTime,
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.time.now()
    }
}

#[derive(Debug, Clone)]
pub struct ManualScheduler {
    time: VirtualTime,
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, delay: Duration, timer: Timer) -> TimerHandle {
        let mut state = self.time.lock();
        state.next_handle += 1;
        let handle = TimerHandle(state.next_handle);
        let deadline = state.now + delay.as_millis() as u64;
        state.pending.push((deadline, handle, timer));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.time.lock().pending.retain(|(_, h, _)| *h != handle);
    }
}
