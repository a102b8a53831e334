//! Kairos Hardware Abstraction Layer
//!
//! This crate defines hardware abstraction traits that can be implemented
//! by chip-specific board crates. This enables the same control code to
//! run on different hardware platforms, and on the host during tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Control code (kairos-core, -drivers)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  kairos-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board crate  │       │  test fakes   │
//! │  (registers)  │       │  (host)       │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`tick::TickSource`] - Free-running wrapping tick counter
//! - [`serial::SerialPort`], [`serial::TxRegister`], [`serial::RxRegister`] -
//!   Register-level duplex serial access
//!
//! None of these traits block. The one busy-wait in the system lives in the
//! driver layer, gated on [`serial::TxRegister::tx_ready`].

#![no_std]
#![deny(unsafe_code)]

pub mod serial;
pub mod tick;

// Re-export key traits at crate root for convenience
pub use serial::{RxRegister, SerialConfig, SerialPort, TxRegister};
pub use tick::{TickCount, TickSource};
