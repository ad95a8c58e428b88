//! # Synchronization Primitives
//!
//! Interrupt-safe shared state for the kernel. The task table, tick counter
//! and tick source are written both from thread mode (registration, arming)
//! and from the SysTick handler, so every access goes through a critical
//! section.
//!
//! On the target, `cortex-m`'s `critical-section-single-core` feature
//! provides the implementation (interrupts masked with PRIMASK). Host tests
//! use the `std` implementation from the `critical-section` crate.

use core::cell::RefCell;

pub use critical_section::CriticalSection;
use critical_section::Mutex;

/// Execute a closure within a critical section (interrupts disabled).
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     // Access shared state safely
/// });
/// ```
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

/// A value shared between thread mode and interrupt handlers.
pub struct Shared<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Borrow the value mutably for the duration of `f`.
    ///
    /// Keep `f` short: interrupts stay masked until it returns. Calling
    /// `lock` on the same value from inside `f` panics.
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}
