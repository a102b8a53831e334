//! Hardware driver implementations
//!
//! This crate provides concrete drivers built on the traits defined in
//! kairos-hal, kept board-agnostic so the same logic runs on hardware
//! and under host tests:
//!
//! - Auxiliary serial link (busy-wait transmit, interrupt-fed receive)

#![no_std]
#![deny(unsafe_code)]

pub mod link;

pub use link::{AuxLink, LinkIsr, LinkStats, RX_QUEUE_LEN};
