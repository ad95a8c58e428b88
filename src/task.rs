//! # Task Model
//!
//! A task is one unit of periodic work: a callback and the number of scheduler
//! ticks between its invocations. Tasks live in a fixed-size slot table owned
//! by the [`Scheduler`](crate::scheduler::Scheduler); the slot index is both
//! the task's identity and its dispatch priority (slot 0 runs first).
//!
//! ## Callback Contract
//!
//! Callbacks run inside the SysTick exception handler, synchronously and to
//! completion. They must not block, sleep or busy-wait: a callback that never
//! returns halts every other task, and one that runs longer than a tick delays
//! (or drops) the next tick.

use core::num::NonZeroU32;

use crate::error::Error;

/// Zero-argument procedure invoked from interrupt context.
///
/// `extern "C"` so that the same callbacks can be registered from C
/// application code through [`ffi`](crate::ffi).
pub type Callback = extern "C" fn();

/// One occupied slot of the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    period: NonZeroU32,
    callback: Callback,
}

impl Task {
    /// Build a task that fires every `period` ticks.
    ///
    /// # Errors
    /// [`Error::ZeroPeriod`] if `period` is zero.
    pub fn new(period: u32, callback: Callback) -> Result<Self, Error> {
        let period = NonZeroU32::new(period).ok_or(Error::ZeroPeriod)?;
        Ok(Self { period, callback })
    }

    /// Ticks between successive invocations.
    #[inline]
    pub const fn period(&self) -> u32 {
        self.period.get()
    }

    #[inline]
    pub const fn callback(&self) -> Callback {
        self.callback
    }

    /// Whether the task fires on scheduler tick `tick`.
    ///
    /// Tick 0 is due for every task.
    #[inline]
    pub const fn is_due(&self, tick: u32) -> bool {
        tick % self.period.get() == 0
    }

    /// Invoke the callback.
    #[inline]
    pub fn run(&self) {
        (self.callback)()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    static RUNS: AtomicU32 = AtomicU32::new(0);

    extern "C" fn count() {
        RUNS.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn noop() {}

    #[test]
    fn test_zero_period_rejected() {
        assert_eq!(Task::new(0, noop), Err(Error::ZeroPeriod));
    }

    #[test]
    fn test_due_ticks() {
        let task = Task::new(5, noop).unwrap();
        assert_eq!(task.period(), 5);
        assert!(task.is_due(0));
        assert!(!task.is_due(1));
        assert!(!task.is_due(4));
        assert!(task.is_due(5));
        assert!(task.is_due(10));
        assert!(!task.is_due(11));
    }

    #[test]
    fn test_period_one_always_due() {
        let task = Task::new(1, noop).unwrap();
        assert!((0..100).all(|t| task.is_due(t)));
        assert!(task.is_due(u32::MAX));
    }

    #[test]
    fn test_run_invokes_callback() {
        let task = Task::new(3, count).unwrap();
        task.run();
        task.run();
        assert_eq!(RUNS.load(Ordering::SeqCst), 2);
    }
}
