//! # C ABI
//!
//! Entry points for C application code linked against the firmware. Each
//! function mirrors a `kernel` call and reports success as `bool`; callbacks
//! arrive as nullable function pointers, and a null one is rejected with
//! [`Error::InvalidCallback`] before anything is modified.
//!
//! ```c
//! extern bool os_register_task(uint32_t slot, uint32_t period, void (*cb)(void));
//! extern bool os_start(void);
//! ```
//!
//! `kernel::init` must have been called from Rust first; it owns the SysTick
//! peripheral.

use crate::error::Error;
use crate::kernel;
use crate::task::Callback;

fn require(callback: Option<Callback>) -> Result<Callback, Error> {
    callback.ok_or(Error::InvalidCallback)
}

fn status(result: Result<(), Error>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("ffi: call rejected: {}", e);
            false
        }
    }
}

#[no_mangle]
pub extern "C" fn os_register_task(slot: u32, period: u32, callback: Option<Callback>) -> bool {
    status(require(callback).and_then(|cb| kernel::register_task(slot as usize, period, cb)))
}

#[no_mangle]
pub extern "C" fn os_start() -> bool {
    status(kernel::start())
}

/// Re-run the tick source configuration (counter left disabled).
#[no_mangle]
pub extern "C" fn stk_init() -> bool {
    status(kernel::init_timer())
}

#[no_mangle]
pub extern "C" fn stk_start() -> bool {
    status(kernel::start_timer())
}

#[no_mangle]
pub extern "C" fn stk_stop() -> bool {
    status(kernel::stop_timer())
}

#[no_mangle]
pub extern "C" fn stk_reset() -> bool {
    status(kernel::reset_timer())
}

/// Current down-counter value; 0 without a tick source.
#[no_mangle]
pub extern "C" fn stk_get_remaining_count() -> u32 {
    kernel::remaining_count().unwrap_or(0)
}

/// Counter ticks since the last reload; 0 without a tick source.
#[no_mangle]
pub extern "C" fn stk_get_elapsed_count() -> u32 {
    kernel::elapsed_count().unwrap_or(0)
}

#[no_mangle]
pub extern "C" fn stk_busy_wait(us: u32) -> bool {
    status(kernel::busy_wait(us))
}

#[no_mangle]
pub extern "C" fn stk_set_single_shot_callback(us: u32, callback: Option<Callback>) -> bool {
    status(require(callback).and_then(|cb| kernel::set_single_shot_callback(us, cb)))
}

#[no_mangle]
pub extern "C" fn stk_set_periodic_callback(us: u32, callback: Option<Callback>) -> bool {
    status(require(callback).and_then(|cb| kernel::set_periodic_callback(us, cb)))
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn idle() {}

    #[test]
    fn test_null_callback_rejected() {
        assert_eq!(require(None), Err(Error::InvalidCallback));
        assert!(require(Some(idle)).is_ok());
    }

    #[test]
    fn test_null_registration_keeps_slot() {
        // Slot 7 is reserved for this test among the kernel-global tests.
        assert!(os_register_task(7, 1000, Some(idle)));
        assert!(!os_register_task(7, 3, None));
        assert_eq!(kernel::task(7).map(|t| t.period()), Some(1000));

        assert!(!os_register_task(7, 0, Some(idle)));
        assert!(!os_register_task(99, 1, Some(idle)));
        assert_eq!(kernel::task(7).map(|t| t.period()), Some(1000));
    }

    #[test]
    fn test_timer_calls_fail_without_tick_source() {
        assert!(!stk_set_single_shot_callback(2000, None));
        assert!(!stk_set_periodic_callback(1000, Some(idle)));
        assert!(!stk_busy_wait(10));
        assert!(!os_start());
        assert_eq!(stk_get_remaining_count(), 0);
    }
}
