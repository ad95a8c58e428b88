//! # Kernel
//!
//! Top-level API for TickOS. Owns the global scheduler and the SysTick tick
//! source, and wires the SysTick exception to the scheduler's dispatch.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init(syst)          ← Take ownership of SysTick
//!         ├─► kernel::register_task()     ← Fill task slots (×N)
//!         ├─► kernel::start()             ← Arm 1 ms periodic tick
//!         └─► loop { wfi }
//!
//! SysTick exception
//!   └─► kernel::on_systick()
//!         ├─► Stk::expire()               ← Single-shot: disarm
//!         ├─► callback()                  ← Scheduler dispatch
//!         └─► Stk::acknowledge()          ← Clear COUNTFLAG
//! ```
//!
//! Every function here takes a short critical section around the shared
//! state; callbacks always run with interrupts enabled and with no borrow
//! held, so they may call back into the kernel. `busy_wait` is the only
//! blocking call and refuses to run from an exception handler.

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::peripheral::SYST;

use crate::arch::cortex_m3;
use crate::error::Error;
use crate::scheduler::Scheduler;
use crate::stk::{Counter, Stk, TickSource};
use crate::sync::Shared;
use crate::task::{Callback, Task};

// ---------------------------------------------------------------------------
// Kernel struct
// ---------------------------------------------------------------------------

/// Scheduler plus tick source driver over the counter `C`.
///
/// The firmware uses the single [`KERNEL`] over SysTick through the free
/// functions below; other instances run on any [`Counter`].
pub struct Kernel<C> {
    /// Task table and tick counter.
    scheduler: Shared<Scheduler>,

    /// `None` until [`install`](Self::install) hands over the counter.
    timer: Shared<Option<Stk<C>>>,

    /// Set while [`on_systick`](Self::on_systick) runs a callback.
    in_handler: AtomicBool,
}

impl<C: Counter> Kernel<C> {
    pub const fn new() -> Self {
        Self {
            scheduler: Shared::new(Scheduler::new()),
            timer: Shared::new(None),
            in_handler: AtomicBool::new(false),
        }
    }

    fn with_timer<R>(&self, f: impl FnOnce(&mut Stk<C>) -> R) -> Result<R, Error> {
        self.timer.lock(|timer| timer.as_mut().map(f).ok_or(Error::TimerUnavailable))
    }

    /// Take ownership of `counter` and configure it (counter left disabled).
    ///
    /// Installing again replaces the driver and drops any armed callback.
    pub fn install(&self, counter: C) {
        let mut stk = Stk::new(counter);
        stk.init();
        self.timer.lock(|timer| *timer = Some(stk));
        debug!("kernel: tick source initialized");
    }

    /// Register `callback` to run every `period` ticks in `slot`, replacing
    /// any previous occupant. Allowed before or after [`start`](Self::start).
    pub fn register_task(&self, slot: usize, period: u32, callback: Callback) -> Result<(), Error> {
        self.scheduler
            .lock(|sched| sched.register_task(slot, period, callback))
            .map_err(|e| {
                error!("kernel: register_task({}) failed: {}", slot, e);
                e
            })
    }

    pub fn remove_task(&self, slot: usize) -> Result<Option<Task>, Error> {
        self.scheduler.lock(|sched| sched.remove_task(slot))
    }

    pub fn task(&self, slot: usize) -> Option<Task> {
        self.scheduler.lock(|sched| sched.task(slot))
    }

    pub fn tick_count(&self) -> u32 {
        self.scheduler.lock(|sched| sched.tick_count())
    }

    /// Arm the tick source to call `on_tick` every millisecond. `on_tick`
    /// must call [`dispatch`](Self::dispatch) on this kernel.
    ///
    /// # Errors
    /// [`Error::TimerUnavailable`] if nothing was installed.
    pub fn start(&self, on_tick: Callback) -> Result<(), Error> {
        self.with_timer(|timer| self.scheduler.lock(|sched| sched.start(timer, on_tick)))?
    }

    /// Sweep the due tasks, then advance. Callbacks run with no lock held.
    pub fn dispatch(&self) {
        let sweep = self.scheduler.lock(|sched| sched.pending());
        trace!("kernel: tick {}", sweep.tick());
        for callback in sweep {
            callback();
        }
        self.scheduler.lock(|sched| sched.advance());
    }

    /// Interrupt path: expire, run the callback, acknowledge.
    pub fn on_systick(&self) {
        if let Ok(Some(callback)) = self.with_timer(|timer| timer.expire()) {
            let outer = self.in_handler.swap(true, Ordering::AcqRel);
            callback();
            self.in_handler.store(outer, Ordering::Release);
        }
        let _ = self.with_timer(|timer| timer.acknowledge());
    }

    pub fn init_timer(&self) -> Result<(), Error> {
        self.with_timer(|timer| timer.init())
    }

    pub fn start_timer(&self) -> Result<(), Error> {
        self.with_timer(|timer| timer.start())
    }

    pub fn stop_timer(&self) -> Result<(), Error> {
        self.with_timer(|timer| timer.stop())
    }

    pub fn reset_timer(&self) -> Result<(), Error> {
        self.with_timer(|timer| timer.reset())
    }

    pub fn remaining_count(&self) -> Result<u32, Error> {
        self.with_timer(|timer| timer.get_remaining_count())
    }

    pub fn elapsed_count(&self) -> Result<u32, Error> {
        self.with_timer(|timer| timer.get_elapsed_count())
    }

    /// Spin for `us` microseconds with interrupts enabled.
    ///
    /// # Errors
    /// - [`Error::InterruptContext`] from an exception handler or a tick
    ///   source callback
    /// - [`Error::TimerBusy`] while a callback is armed
    /// - [`Error::DurationOutOfRange`], [`Error::TimerUnavailable`]
    pub fn busy_wait(&self, us: u32) -> Result<(), Error> {
        if self.in_handler.load(Ordering::Acquire) || cortex_m3::in_interrupt() {
            return Err(Error::InterruptContext);
        }
        self.with_timer(|timer| {
            if timer.is_armed() {
                Err(Error::TimerBusy)
            } else {
                timer.begin_wait(us)
            }
        })??;
        while !self.with_timer(|timer| timer.poll_wait())? {
            hint::spin_loop();
        }
        Ok(())
    }

    pub fn set_single_shot_callback(&self, us: u32, callback: Callback) -> Result<(), Error> {
        self.with_timer(|timer| timer.set_single_shot_callback(us, callback))?
    }

    pub fn set_periodic_callback(&self, us: u32, callback: Callback) -> Result<(), Error> {
        self.with_timer(|timer| timer.set_periodic_callback(us, callback))?
    }
}

impl<C: Counter> Default for Kernel<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Global instance
// ---------------------------------------------------------------------------

/// The firmware kernel, driven by the SysTick exception.
pub static KERNEL: Kernel<SYST> = Kernel::new();

/// Take ownership of the SysTick peripheral and configure it (counter
/// left disabled).
///
/// Calling `init` again replaces the driver and drops any armed callback.
pub fn init(syst: SYST) {
    KERNEL.install(syst);
}

/// Register `callback` to run every `period` ticks in `slot`, replacing any
/// previous occupant. Allowed before or after [`start`].
pub fn register_task(slot: usize, period: u32, callback: Callback) -> Result<(), Error> {
    KERNEL.register_task(slot, period, callback)
}

/// Free `slot`, returning its previous occupant.
pub fn remove_task(slot: usize) -> Result<Option<Task>, Error> {
    KERNEL.remove_task(slot)
}

/// The task occupying `slot`, if any.
pub fn task(slot: usize) -> Option<Task> {
    KERNEL.task(slot)
}

/// Ticks dispatched since [`start`].
pub fn tick_count() -> u32 {
    KERNEL.tick_count()
}

/// Arm the tick source to dispatch the scheduler every millisecond.
///
/// Returns once armed; the caller should idle (e.g. `wfi` in a loop).
///
/// # Errors
/// [`Error::TimerUnavailable`] if [`init`] has not been called.
pub fn start() -> Result<(), Error> {
    KERNEL.start(dispatch_tick)
}

/// The scheduler's tick callback.
pub(crate) extern "C" fn dispatch_tick() {
    KERNEL.dispatch();
}

/// Tick source interrupt path, called from the SysTick exception.
pub fn on_systick() {
    KERNEL.on_systick();
}

// ---------------------------------------------------------------------------
// Tick source API
// ---------------------------------------------------------------------------

/// Re-run the tick source configuration; the counter is left disabled.
pub fn init_timer() -> Result<(), Error> {
    KERNEL.init_timer()
}

/// Resume counting after [`stop_timer`]. Does not re-arm after
/// [`reset_timer`] or a [`busy_wait`]; call [`start`] again for the tick.
pub fn start_timer() -> Result<(), Error> {
    KERNEL.start_timer()
}

/// Stop counting. Stops the scheduler tick too if it is running.
pub fn stop_timer() -> Result<(), Error> {
    KERNEL.stop_timer()
}

/// Disable the counter, zero its registers and drop any armed callback.
pub fn reset_timer() -> Result<(), Error> {
    KERNEL.reset_timer()
}

/// Current down-counter value.
pub fn remaining_count() -> Result<u32, Error> {
    KERNEL.remaining_count()
}

/// Counter ticks since the last reload; valid for one period only.
pub fn elapsed_count() -> Result<u32, Error> {
    KERNEL.elapsed_count()
}

/// Spin for `us` microseconds.
///
/// Interrupts stay enabled while waiting, so the wait is at least `us` long.
/// See [`Kernel::busy_wait`] for the refusals.
pub fn busy_wait(us: u32) -> Result<(), Error> {
    KERNEL.busy_wait(us)
}

/// Invoke `callback` once, `us` microseconds from now. Replaces the
/// scheduler tick if it is running.
pub fn set_single_shot_callback(us: u32, callback: Callback) -> Result<(), Error> {
    KERNEL.set_single_shot_callback(us, callback)
}

/// Invoke `callback` every `us` microseconds. Replaces the scheduler tick if
/// it is running.
pub fn set_periodic_callback(us: u32, callback: Callback) -> Result<(), Error> {
    KERNEL.set_periodic_callback(us, callback)
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STK_TICKS_PER_US;
    use crate::stk::tests::FakeCounter;
    use core::sync::atomic::{AtomicU32, Ordering};

    /// Counter clocks in one scheduler tick.
    const TICK_CLOCKS: u32 = crate::config::TICK_INTERVAL_US * STK_TICKS_PER_US;

    /// Simulate `n` counter clocks, taking the SysTick path on every expiry.
    fn run_clocks(kernel: &Kernel<FakeCounter>, n: u32) {
        for _ in 0..n {
            let raised = kernel.with_timer(|t| t.counter_mut().advance(1)).unwrap();
            if raised > 0 {
                kernel.on_systick();
            }
        }
    }

    fn is_armed(kernel: &Kernel<FakeCounter>) -> bool {
        kernel.with_timer(|t| t.is_armed()).unwrap()
    }

    #[test]
    fn test_kernel_single_shot_fires_once() {
        static K: Kernel<FakeCounter> = Kernel::new();
        static SHOTS: AtomicU32 = AtomicU32::new(0);
        extern "C" fn shot() {
            SHOTS.fetch_add(1, Ordering::SeqCst);
        }

        assert_eq!(K.set_single_shot_callback(10, shot), Err(Error::TimerUnavailable));
        K.install(FakeCounter::default());
        K.set_single_shot_callback(10, shot).unwrap();
        assert!(is_armed(&K));

        run_clocks(&K, 10 * STK_TICKS_PER_US - 1);
        assert_eq!(SHOTS.load(Ordering::SeqCst), 0);
        run_clocks(&K, 1);
        assert_eq!(SHOTS.load(Ordering::SeqCst), 1);
        assert!(!is_armed(&K));

        run_clocks(&K, 10 * 10 * STK_TICKS_PER_US);
        assert_eq!(SHOTS.load(Ordering::SeqCst), 1);
        // A late interrupt with nothing armed is a no-op.
        K.on_systick();
        assert_eq!(SHOTS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_systick_path_dispatches_and_acknowledges() {
        static K: Kernel<FakeCounter> = Kernel::new();
        static RUNS: AtomicU32 = AtomicU32::new(0);
        extern "C" fn on_tick() {
            K.dispatch();
        }
        extern "C" fn every_tick() {
            RUNS.fetch_add(1, Ordering::SeqCst);
        }

        K.install(FakeCounter::default());
        K.register_task(0, 1, every_tick).unwrap();
        K.start(on_tick).unwrap();
        assert_eq!(K.tick_count(), 0);

        run_clocks(&K, 3 * TICK_CLOCKS);
        assert_eq!(K.tick_count(), 3);
        assert_eq!(RUNS.load(Ordering::SeqCst), 3);
        // COUNTFLAG is cleared after each callback.
        assert!(!K.with_timer(|t| t.counter().flag).unwrap());
        assert!(is_armed(&K));
    }

    #[test]
    fn test_busy_wait_refused_while_tick_armed() {
        static K: Kernel<FakeCounter> = Kernel::new();
        static RUNS: AtomicU32 = AtomicU32::new(0);
        extern "C" fn on_tick() {
            K.dispatch();
        }
        extern "C" fn every_tick() {
            RUNS.fetch_add(1, Ordering::SeqCst);
        }

        K.install(FakeCounter::default());
        K.register_task(0, 1, every_tick).unwrap();
        K.start(on_tick).unwrap();
        assert_eq!(K.busy_wait(10), Err(Error::TimerBusy));
        assert!(is_armed(&K));

        // Stopped, the counter is free for a wait; resuming afterwards
        // does not bring the tick back.
        K.stop_timer().unwrap();
        K.busy_wait(10).unwrap();
        K.start_timer().unwrap();
        assert!(!is_armed(&K));
        run_clocks(&K, 2 * TICK_CLOCKS);
        assert_eq!(RUNS.load(Ordering::SeqCst), 0);

        K.start(on_tick).unwrap();
        run_clocks(&K, 2 * TICK_CLOCKS);
        assert_eq!(RUNS.load(Ordering::SeqCst), 2);
        assert_eq!(K.tick_count(), 2);
    }

    #[test]
    fn test_busy_wait_refused_from_callback() {
        static K: Kernel<FakeCounter> = Kernel::new();
        static WAIT: Shared<Option<Result<(), Error>>> = Shared::new(None);
        extern "C" fn waiter() {
            let result = K.busy_wait(10);
            WAIT.lock(|w| *w = Some(result));
        }

        K.install(FakeCounter::default());
        K.set_single_shot_callback(10, waiter).unwrap();
        run_clocks(&K, 10 * STK_TICKS_PER_US);
        // The single-shot disarmed before the callback ran, so only the
        // handler context blocks the wait.
        assert_eq!(WAIT.lock(|w| *w), Some(Err(Error::InterruptContext)));

        // Back in thread mode the counter is free again.
        K.start_timer().unwrap();
        assert!(!is_armed(&K));
        assert_eq!(K.busy_wait(10), Ok(()));
        assert_eq!(K.busy_wait(0), Err(Error::DurationOutOfRange { us: 0 }));
    }

    // The global kernel is process-wide; everything that touches it lives
    // in this one test, on slots nothing else uses.

    static FAST: AtomicU32 = AtomicU32::new(0);
    static SLOW: AtomicU32 = AtomicU32::new(0);

    extern "C" fn fast() {
        FAST.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn slow() {
        SLOW.fetch_add(1, Ordering::SeqCst);
    }

    // Registers a task from inside a callback; must not deadlock.
    extern "C" fn spawner() {
        register_task(5, 4, slow).unwrap();
        let _ = remove_task(3);
    }

    #[test]
    fn test_global_dispatch() {
        // No SysTick on the host.
        assert_eq!(start(), Err(Error::TimerUnavailable));
        assert_eq!(busy_wait(10), Err(Error::TimerUnavailable));
        assert_eq!(remaining_count(), Err(Error::TimerUnavailable));

        register_task(0, 2, fast).unwrap();
        register_task(3, 1, spawner).unwrap();
        assert_eq!(
            register_task(crate::config::MAX_TASKS, 1, fast),
            Err(Error::SlotOutOfRange { slot: crate::config::MAX_TASKS })
        );
        assert_eq!(task(0).map(|t| t.period()), Some(2));

        let start_tick = tick_count();
        for _ in 0..8 {
            dispatch_tick();
        }
        assert_eq!(tick_count(), start_tick.wrapping_add(8));

        // Period 2 over 8 consecutive ticks fires 4 times.
        assert_eq!(FAST.load(Ordering::SeqCst), 4);
        // The spawner ran once, then removed itself.
        assert!(task(3).is_none());
        assert_eq!(task(5).map(|t| t.period()), Some(4));
        // Slot 5 joined from the second tick on.
        let expected = (1..8u32)
            .filter(|i| start_tick.wrapping_add(*i) % 4 == 0)
            .count() as u32;
        assert_eq!(SLOW.load(Ordering::SeqCst), expected);
    }
}
