//! # STK — SysTick Tick Source
//!
//! Drives the 24-bit SysTick down-counter as either a blocking delay or an
//! interrupt-driven timer with a single registered callback.
//!
//! The driver is split in two layers:
//!
//! - [`Counter`]: raw register access (reload, current value, enable bits,
//!   COUNTFLAG). Implemented for `cortex_m::peripheral::SYST` in the arch
//!   port, and by a fake counter in the host tests.
//! - [`Stk`]: the state machine on top — interval arithmetic, single-shot vs
//!   periodic mode, and what the interrupt handler does on expiry.
//!
//! ## State Machine
//!
//! ```text
//!            set_*_callback() / start()
//!   ┌──────┐ ─────────────────────────► ┌───────┐
//!   │ Idle │                            │ Armed │ ◄─┐ expire() (periodic)
//!   └──────┘ ◄───────────────────────── └───────┘ ──┘
//!         stop() / reset() / expire() (single-shot)
//! ```
//!
//! The scheduler only needs the narrower [`TickSource`] contract.

use core::hint;

use crate::config::{STK_MAX_RELOAD, STK_TICKS_PER_US};
use crate::error::Error;
use crate::task::Callback;

// ---------------------------------------------------------------------------
// Register-level abstraction
// ---------------------------------------------------------------------------

/// Register access to a SysTick-style down-counter.
///
/// The counter loads `reload` when it reaches zero, sets a sticky count flag,
/// and (if enabled) raises its interrupt.
pub trait Counter {
    /// Select the compile-time clock source and leave counter and interrupt disabled.
    fn configure(&mut self);
    fn set_reload(&mut self, value: u32);
    fn reload(&self) -> u32;
    fn current(&self) -> u32;
    /// Zero the current value and clear the count flag.
    fn clear_current(&mut self);
    fn enable_counter(&mut self);
    fn disable_counter(&mut self);
    fn enable_interrupt(&mut self);
    fn disable_interrupt(&mut self);
    /// Read and clear the count flag.
    fn has_wrapped(&mut self) -> bool;
}

/// The timer contract the scheduler consumes.
pub trait TickSource {
    fn init(&mut self);
    fn start(&mut self);
    fn stop(&mut self);
    fn reset(&mut self);
    /// Invoke `callback` from interrupt context every `interval_us` microseconds.
    fn set_periodic_callback(&mut self, interval_us: u32, callback: Callback)
        -> Result<(), Error>;
}

// ---------------------------------------------------------------------------
// Driver state
// ---------------------------------------------------------------------------

/// Interval mode of an armed callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Disarm after the first expiry.
    SingleShot,
    /// Keep firing; the hardware reloads by itself.
    Periodic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Idle,
    Armed,
}

/// Convert a duration to counter ticks.
///
/// # Errors
/// [`Error::DurationOutOfRange`] if the result is zero or doesn't fit the
/// 24-bit reload register.
pub fn ticks_for(us: u32) -> Result<u32, Error> {
    match us.checked_mul(STK_TICKS_PER_US) {
        Some(ticks) if ticks > 0 && ticks <= STK_MAX_RELOAD + 1 => Ok(ticks),
        _ => Err(Error::DurationOutOfRange { us }),
    }
}

/// SysTick driver.
pub struct Stk<C> {
    counter: C,
    mode: Mode,
    state: State,
    callback: Option<Callback>,
}

impl<C: Counter> Stk<C> {
    pub const fn new(counter: C) -> Self {
        Self {
            counter,
            mode: Mode::Periodic,
            state: State::Idle,
            callback: None,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether an interrupt callback is currently armed.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.state == State::Armed && self.callback.is_some()
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    #[cfg(test)]
    pub(crate) fn counter_mut(&mut self) -> &mut C {
        &mut self.counter
    }

    /// Current down-counter value, `0..=reload`.
    #[inline]
    pub fn get_remaining_count(&self) -> u32 {
        self.counter.current()
    }

    /// Ticks counted since the last reload.
    ///
    /// Only meaningful within one period: once the counter has wrapped past
    /// zero the result no longer reflects the total time elapsed.
    #[inline]
    pub fn get_elapsed_count(&self) -> u32 {
        (self.counter.reload() + 1).wrapping_sub(self.counter.current())
    }

    /// Spin until `us` microseconds have passed. Blocks the caller and can't
    /// be cancelled; never call it from a task callback.
    ///
    /// # Errors
    /// [`Error::DurationOutOfRange`] for a duration the counter can't represent.
    pub fn busy_wait(&mut self, us: u32) -> Result<(), Error> {
        self.begin_wait(us)?;
        while !self.poll_wait() {
            hint::spin_loop();
        }
        Ok(())
    }

    /// Load and start the counter for a polled wait of `us` microseconds.
    /// The interrupt stays disabled.
    pub fn begin_wait(&mut self, us: u32) -> Result<(), Error> {
        let ticks = ticks_for(us)?;
        self.reset();
        self.load(ticks);
        self.counter.enable_counter();
        Ok(())
    }

    /// Check a wait started by [`begin_wait`](Self::begin_wait); stops the
    /// counter and returns `true` once the interval has elapsed.
    pub fn poll_wait(&mut self) -> bool {
        if self.counter.has_wrapped() {
            self.stop();
            true
        } else {
            false
        }
    }

    /// Invoke `callback` once, `us` microseconds from now.
    pub fn set_single_shot_callback(
        &mut self,
        us: u32,
        callback: Callback,
    ) -> Result<(), Error> {
        self.arm(us, callback, Mode::SingleShot)
    }

    fn arm(&mut self, us: u32, callback: Callback, mode: Mode) -> Result<(), Error> {
        let ticks = ticks_for(us)?;
        self.counter.disable_counter();
        self.callback = Some(callback);
        self.mode = mode;
        self.load(ticks);
        self.counter.enable_interrupt();
        self.counter.enable_counter();
        self.state = State::Armed;
        debug!("stk: armed {} ticks, mode {}", ticks, mode);
        Ok(())
    }

    fn load(&mut self, ticks: u32) {
        // The counter spans reload..=0, so `ticks` counts need a reload of ticks - 1.
        self.counter.set_reload(ticks - 1);
        self.counter.clear_current();
    }

    /// Counter-expiry half of the interrupt handler.
    ///
    /// Returns the callback to invoke, if any. A single-shot arming is reset
    /// before its callback is handed out, so it fires at most once. The caller
    /// invokes the callback and then calls [`acknowledge`](Self::acknowledge).
    pub fn expire(&mut self) -> Option<Callback> {
        if self.state != State::Armed {
            return None;
        }
        let callback = self.callback?;
        if self.mode == Mode::SingleShot {
            self.reset();
        }
        Some(callback)
    }

    /// Clear the pending count flag after the expiry callback has run.
    pub fn acknowledge(&mut self) {
        let _ = self.counter.has_wrapped();
    }

    /// Full interrupt handler: expire, invoke, acknowledge.
    ///
    /// Only usable when the callback can't reach this driver; the kernel
    /// splits the steps so the callback runs outside its borrow.
    pub fn on_interrupt(&mut self) {
        if let Some(callback) = self.expire() {
            callback();
        }
        self.acknowledge();
    }
}

impl<C: Counter> TickSource for Stk<C> {
    fn init(&mut self) {
        self.counter.configure();
        self.counter.disable_counter();
        self.callback = None;
        self.state = State::Idle;
    }

    /// Resume counting. Re-arms only after a [`stop`](TickSource::stop):
    /// `init` and `reset` drop the callback along with the interrupt enable.
    fn start(&mut self) {
        self.counter.enable_counter();
        if self.callback.is_some() {
            self.state = State::Armed;
        }
    }

    fn stop(&mut self) {
        self.counter.disable_counter();
        self.state = State::Idle;
    }

    fn reset(&mut self) {
        self.counter.disable_counter();
        self.counter.disable_interrupt();
        self.counter.set_reload(0);
        self.counter.clear_current();
        let _ = self.counter.has_wrapped();
        self.callback = None;
        self.state = State::Idle;
    }

    fn set_periodic_callback(&mut self, us: u32, callback: Callback) -> Result<(), Error> {
        self.arm(us, callback, Mode::Periodic)
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
