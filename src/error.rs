//! Error type shared by the scheduler, the tick source and the kernel API.

use core::fmt;

/// Everything that can go wrong in a TickOS call.
///
/// Validation is local to the call that failed: nothing is retried, and a
/// call that returns an error leaves the task table and tick counter as they
/// were. `Scheduler::start` re-initializes the tick source before arming it,
/// so a failed start leaves the timer idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A null callback was passed across the C ABI.
    InvalidCallback,
    /// Slot index outside `0..MAX_TASKS`.
    SlotOutOfRange { slot: usize },
    /// A task period of zero ticks.
    ZeroPeriod,
    /// The requested duration is zero ticks or exceeds the 24-bit reload range.
    DurationOutOfRange { us: u32 },
    /// The kernel has no tick source; `kernel::init` was not called.
    TimerUnavailable,
    /// The tick source is armed with a callback and can't be borrowed for a busy-wait.
    TimerBusy,
    /// A blocking call was made from an exception handler.
    InterruptContext,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCallback => f.write_str("null callback"),
            Error::SlotOutOfRange { slot } => write!(f, "slot {} out of range", slot),
            Error::ZeroPeriod => f.write_str("task period must be at least one tick"),
            Error::DurationOutOfRange { us } => {
                write!(f, "duration of {} us is outside the SysTick range", us)
            }
            Error::TimerUnavailable => f.write_str("tick source not initialized"),
            Error::TimerBusy => f.write_str("tick source is armed"),
            Error::InterruptContext => f.write_str("blocking call from interrupt context"),
        }
    }
}
