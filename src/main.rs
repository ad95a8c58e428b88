//! # TickOS Example Firmware
//!
//! Demonstrates the periodic scheduler on an STM32F103 with four tasks:
//!
//! | Slot | Task | Period | Behavior |
//! |------|------|--------|----------|
//! | 0 | `heartbeat` | 500 ms | Counts heartbeats |
//! | 1 | `sample` | 10 ms | Simulated sensor sampling |
//! | 2 | `report` | 1000 ms | Logs counters |
//! | 3 | `watchdog_kick` | 5 ms | Cheap, high-rate work |
//!
//! At tick 0 and every 1000 ticks, slots 0–3 all fire, in slot order.
//! A one-shot SysTick callback is also exercised before the scheduler takes
//! over the timer.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

use tickos::kernel;

static HEARTBEATS: AtomicU32 = AtomicU32::new(0);
static SAMPLES: AtomicU32 = AtomicU32::new(0);
static KICKS: AtomicU32 = AtomicU32::new(0);
static BOOT_TIMER_FIRED: AtomicU32 = AtomicU32::new(0);

// ---------------------------------------------------------------------------
// Task entry points
// ---------------------------------------------------------------------------

extern "C" fn heartbeat() {
    HEARTBEATS.fetch_add(1, Ordering::Relaxed);
}

/// Simulated sensor read; a few hundred cycles, well under one tick.
extern "C" fn sample() {
    let mut acc: u32 = 0;
    for i in 0..200u32 {
        acc = acc.wrapping_add(i);
    }
    core::hint::black_box(acc);
    SAMPLES.fetch_add(1, Ordering::Relaxed);
}

extern "C" fn report() {
    #[cfg(feature = "defmt")]
    defmt::info!(
        "tick {}: heartbeats={} samples={} kicks={}",
        kernel::tick_count(),
        HEARTBEATS.load(Ordering::Relaxed),
        SAMPLES.load(Ordering::Relaxed),
        KICKS.load(Ordering::Relaxed)
    );
}

extern "C" fn watchdog_kick() {
    KICKS.fetch_add(1, Ordering::Relaxed);
}

extern "C" fn boot_timer() {
    BOOT_TIMER_FIRED.fetch_add(1, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Firmware entry point. Initializes the kernel, registers tasks and starts
/// the scheduler, then sleeps between ticks.
#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init(cp.SYST);

    // Short blocking delay, then a one-shot callback to check the timer.
    kernel::busy_wait(100).expect("busy_wait");
    kernel::set_single_shot_callback(2000, boot_timer).expect("single-shot");
    while BOOT_TIMER_FIRED.load(Ordering::Relaxed) == 0 {
        cortex_m::asm::wfi();
    }

    kernel::register_task(0, 500, heartbeat).expect("heartbeat");
    kernel::register_task(1, 10, sample).expect("sample");
    kernel::register_task(2, 1000, report).expect("report");
    kernel::register_task(3, 5, watchdog_kick).expect("watchdog_kick");

    // Arms the 1 ms periodic tick; dispatch happens in the SysTick handler.
    kernel::start().expect("Failed to start scheduler");

    loop {
        cortex_m::asm::wfi();
    }
}
