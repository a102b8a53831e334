//! Board-agnostic core logic for the motion control firmware
//!
//! This crate contains all control logic that does not depend on
//! specific hardware implementations:
//!
//! - Single-shot interval timers over wrapping tick counters
//! - First layer calibration math and command generation
//!
//! Everything here is polled from the main loop. Nothing blocks, nothing
//! allocates, and hardware is only reached through the `kairos-hal` traits,
//! so the whole crate runs under host tests unchanged.

#![no_std]
#![deny(unsafe_code)]

pub mod calibration;
pub mod timer;

pub use timer::{IntervalTimer, LongTimer, ShortTimer};
