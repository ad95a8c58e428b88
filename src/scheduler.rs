//! # Scheduler
//!
//! Cooperative periodic scheduler. Holds a fixed-size table of tasks and a
//! tick counter; the tick source calls the dispatch routine once per
//! millisecond from interrupt context.
//!
//! ## Dispatch Algorithm
//!
//! At each tick:
//! 1. **Sweep**: for every slot in ascending order, if occupied and
//!    `tick % period == 0`, invoke the task's callback synchronously
//! 2. **Advance**: increment the tick counter by one (wrapping at `u32::MAX`)
//!
//! Tick 0 is due for every task, so all registered tasks fire on the first
//! tick after [`Scheduler::start`].
//!
//! ## Split Sweep
//!
//! [`Scheduler::pending`] copies out the due callbacks for the current tick
//! and [`Scheduler::advance`] bumps the counter. The kernel takes the copy
//! under a critical section and runs callbacks outside it, so a callback may
//! register or remove tasks without re-entering a borrowed scheduler.
//! [`Scheduler::dispatch`] is the single-owner form of the same sweep.

use crate::config::{MAX_TASKS, TICK_INTERVAL_US};
use crate::error::Error;
use crate::stk::TickSource;
use crate::task::{Callback, Task};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The task table and tick counter. Stored behind a critical-section mutex
/// in `kernel.rs`; `N` defaults to [`MAX_TASKS`].
pub struct Scheduler<const N: usize = MAX_TASKS> {
    /// Slot-indexed task table. `None` is a free slot.
    tasks: [Option<Task>; N],

    /// Ticks dispatched since `start()`. Wraps.
    tick_count: u32,

    started: bool,
}

impl<const N: usize> Scheduler<N> {
    pub const fn new() -> Self {
        Self {
            tasks: [None; N],
            tick_count: 0,
            started: false,
        }
    }

    /// Number of slots in the table.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The task occupying `slot`, if any.
    pub fn task(&self, slot: usize) -> Option<Task> {
        self.tasks.get(slot).copied().flatten()
    }

    /// Install a task that fires every `period` ticks into `slot`,
    /// replacing any previous occupant.
    ///
    /// # Errors
    /// - [`Error::SlotOutOfRange`] if `slot >= N`
    /// - [`Error::ZeroPeriod`] if `period == 0`
    ///
    /// The slot is left untouched on error.
    pub fn register_task(
        &mut self,
        slot: usize,
        period: u32,
        callback: Callback,
    ) -> Result<(), Error> {
        let entry = self.tasks.get_mut(slot).ok_or(Error::SlotOutOfRange { slot })?;
        let task = Task::new(period, callback)?;
        if entry.is_some() {
            warn!("scheduler: slot {} overwritten", slot);
        }
        *entry = Some(task);
        debug!("scheduler: slot {} every {} ticks", slot, period);
        Ok(())
    }

    /// Free `slot`, returning its previous occupant.
    ///
    /// # Errors
    /// [`Error::SlotOutOfRange`] if `slot >= N`.
    pub fn remove_task(&mut self, slot: usize) -> Result<Option<Task>, Error> {
        let entry = self.tasks.get_mut(slot).ok_or(Error::SlotOutOfRange { slot })?;
        Ok(entry.take())
    }

    /// Reset the tick counter and arm `timer` to call `on_tick` every
    /// [`TICK_INTERVAL_US`] microseconds.
    ///
    /// `on_tick` must end up calling [`dispatch`](Self::dispatch) (or the
    /// `pending`/`advance` pair) on this scheduler. Returns once the timer
    /// is armed; the caller then idles.
    ///
    /// The tick counter is only reset once the timer is armed; a failed
    /// arming leaves the scheduler as it was (the timer itself has already
    /// been re-initialized and stays idle).
    pub fn start<T: TickSource>(&mut self, timer: &mut T, on_tick: Callback) -> Result<(), Error> {
        timer.init();
        timer.set_periodic_callback(TICK_INTERVAL_US, on_tick)?;
        self.tick_count = 0;
        self.started = true;
        info!("scheduler: started, {} us tick", TICK_INTERVAL_US);
        Ok(())
    }

    /// Callbacks due on the current tick, in slot order.
    pub fn pending(&self) -> Sweep<N> {
        Sweep {
            tick: self.tick_count,
            tasks: self.tasks,
            next: 0,
        }
    }

    /// Move to the next tick.
    #[inline]
    pub fn advance(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    /// Run every task due on the current tick, then advance.
    pub fn dispatch(&mut self) {
        for callback in self.pending() {
            callback();
        }
        self.advance();
    }

    #[cfg(test)]
    pub(crate) fn set_tick_count(&mut self, tick: u32) {
        self.tick_count = tick;
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Sweep iterator
// ---------------------------------------------------------------------------

/// Snapshot of the task table for one tick. Yields due callbacks in
/// ascending slot order.
#[derive(Clone)]
pub struct Sweep<const N: usize> {
    tick: u32,
    tasks: [Option<Task>; N],
    next: usize,
}

impl<const N: usize> Sweep<N> {
    /// The tick this sweep was taken for.
    #[inline]
    pub fn tick(&self) -> u32 {
        self.tick
    }
}

impl<const N: usize> Iterator for Sweep<N> {
    type Item = Callback;

    fn next(&mut self) -> Option<Callback> {
        while self.next < N {
            let slot = self.next;
            self.next += 1;
            match self.tasks[slot] {
                Some(task) if task.is_due(self.tick) => return Some(task.callback()),
                _ => {}
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
