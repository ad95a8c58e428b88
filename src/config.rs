//! # TickOS Configuration
//!
//! Compile-time constants governing the scheduler and the SysTick tick source.
//! All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of task slots in the scheduler table.
/// Slot indices run from `0` to `MAX_TASKS - 1`; lower slots run first.
pub const MAX_TASKS: usize = 8;

/// Scheduler tick interval in microseconds (1 ms).
pub const TICK_INTERVAL_US: u32 = 1000;

/// System (AHB) clock frequency in Hz. 72 MHz is the STM32F10x maximum,
/// reached from an 8 MHz HSE through the PLL.
pub const SYSTEM_CLOCK_HZ: u32 = 72_000_000;

/// Clock feeding the SysTick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// Processor clock (HCLK).
    Ahb,
    /// HCLK / 8, the "external" SysTick reference on STM32F10x.
    AhbDiv8,
}

impl ClockSource {
    /// Counter input frequency for a given AHB clock.
    pub const fn frequency(self, ahb_hz: u32) -> u32 {
        match self {
            ClockSource::Ahb => ahb_hz,
            ClockSource::AhbDiv8 => ahb_hz / 8,
        }
    }
}

/// Selected SysTick clock source.
pub const STK_CLOCK_SOURCE: ClockSource = ClockSource::AhbDiv8;

/// SysTick counter input frequency in Hz.
pub const STK_CLOCK_HZ: u32 = STK_CLOCK_SOURCE.frequency(SYSTEM_CLOCK_HZ);

/// Counter ticks per microsecond.
pub const STK_TICKS_PER_US: u32 = STK_CLOCK_HZ / 1_000_000;

/// SysTick is a 24-bit down-counter.
pub const STK_MAX_RELOAD: u32 = 0x00FF_FFFF;

// A clock source that can't express whole microseconds, or a tick interval
// that doesn't fit the 24-bit reload register, is a build failure.
const _: () = assert!(
    STK_CLOCK_HZ % 1_000_000 == 0 && STK_TICKS_PER_US > 0,
    "SysTick clock must be a whole number of MHz"
);
const _: () = assert!(
    TICK_INTERVAL_US as u64 * STK_TICKS_PER_US as u64 <= STK_MAX_RELOAD as u64 + 1,
    "scheduler tick interval does not fit the SysTick reload register"
);
const _: () = assert!(MAX_TASKS > 0, "scheduler needs at least one slot");
