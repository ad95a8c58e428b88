//! # Cortex-M3 Port Layer
//!
//! Hardware-specific code for the STM32F10x (ARM Cortex-M3) core: register
//! access for the SysTick counter, interrupt-context detection, and the
//! SysTick exception vector.
//!
//! ## SysTick on STM32F10x
//!
//! - Clock source: HCLK (`SystClkSource::Core`) or HCLK/8
//!   (`SystClkSource::External`), chosen by `config::STK_CLOCK_SOURCE`
//! - 24-bit down-counter; reading CTRL clears COUNTFLAG, writing CVR clears
//!   both the current value and COUNTFLAG

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;

use crate::config::{ClockSource, STK_CLOCK_SOURCE};
use crate::stk::Counter;

// ---------------------------------------------------------------------------
// SysTick register access
// ---------------------------------------------------------------------------

impl Counter for SYST {
    fn configure(&mut self) {
        let source = match STK_CLOCK_SOURCE {
            ClockSource::Ahb => SystClkSource::Core,
            ClockSource::AhbDiv8 => SystClkSource::External,
        };
        self.disable_counter();
        self.disable_interrupt();
        self.set_clock_source(source);
    }

    #[inline]
    fn set_reload(&mut self, value: u32) {
        SYST::set_reload(self, value)
    }

    #[inline]
    fn reload(&self) -> u32 {
        SYST::get_reload()
    }

    #[inline]
    fn current(&self) -> u32 {
        SYST::get_current()
    }

    #[inline]
    fn clear_current(&mut self) {
        SYST::clear_current(self)
    }

    #[inline]
    fn enable_counter(&mut self) {
        SYST::enable_counter(self)
    }

    #[inline]
    fn disable_counter(&mut self) {
        SYST::disable_counter(self)
    }

    #[inline]
    fn enable_interrupt(&mut self) {
        SYST::enable_interrupt(self)
    }

    #[inline]
    fn disable_interrupt(&mut self) {
        SYST::disable_interrupt(self)
    }

    #[inline]
    fn has_wrapped(&mut self) -> bool {
        SYST::has_wrapped(self)
    }
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Whether the core is currently executing an exception handler.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn in_interrupt() -> bool {
    use cortex_m::peripheral::scb::VectActive;
    use cortex_m::peripheral::SCB;

    !matches!(SCB::vect_active(), VectActive::ThreadMode)
}

/// Host builds have no exception context.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub fn in_interrupt() -> bool {
    false
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — hands the expiry to the kernel's tick source.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[cortex_m_rt::exception]
fn SysTick() {
    crate::kernel::on_systick();
}
