//! # Architecture Abstraction Layer
//!
//! Binds the generic tick source to real hardware. Currently implements the
//! Cortex-M3 (STM32F10x) port; other cores add sibling modules that provide a
//! [`Counter`](crate::stk::Counter) implementation and a SysTick-equivalent
//! vector calling [`kernel::on_systick`](crate::kernel::on_systick).

pub mod cortex_m3;
