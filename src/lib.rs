//! # TickOS — SysTick Cooperative Scheduler
//!
//! A minimal periodic task scheduler for STM32F10x (ARM Cortex-M3)
//! microcontrollers, driven by the SysTick timer.
//!
//! ## Overview
//!
//! Tasks are plain callbacks registered into a fixed-size slot table, each
//! with a period in milliseconds. Every SysTick interrupt (1 ms) the
//! scheduler runs all tasks whose period divides the current tick count, in
//! ascending slot order, then advances the tick.
//!
//! There is no preemption and no per-task stack: every callback runs to
//! completion inside the SysTick handler.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │               Application (Rust or C)                   │
//! ├────────────────────────────────────────────────────────┤
//! │        Kernel API (kernel.rs) · C ABI (ffi.rs)          │
//! │   init() · register_task() · start() · busy_wait()     │
//! ├───────────────────────────┬────────────────────────────┤
//! │  Scheduler                │  Tick Source               │
//! │  scheduler.rs · task.rs   │  stk.rs                    │
//! │  ─ register_task()        │  ─ set_periodic_callback() │
//! │  ─ dispatch()             │  ─ set_single_shot_callback│
//! │                           │  ─ busy_wait()             │
//! ├───────────────────────────┴────────────────────────────┤
//! │   Arch Port (arch/cortex_m3.rs) · Sync (sync.rs)        │
//! │     SYST register access · SysTick vector · CS          │
//! ├────────────────────────────────────────────────────────┤
//! │          STM32F10x / ARM Cortex-M3 Hardware             │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! extern "C" fn blink() { /* toggle a pin */ }
//!
//! let cp = cortex_m::Peripherals::take().unwrap();
//! kernel::init(cp.SYST);
//! kernel::register_task(0, 500, blink)?;
//! kernel::start()?;
//! loop { cortex_m::asm::wfi(); }
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed-size task table**: `[Option<Task>; MAX_TASKS]`
//! - **Critical sections**: `critical_section::with()` for shared state

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod config;
pub mod error;
pub mod task;
pub mod stk;
pub mod scheduler;
pub mod arch;
pub mod sync;
pub mod kernel;
pub mod ffi;

pub use error::Error;
pub use task::Callback;
