//! Tick counter abstractions
//!
//! Provides traits for reading a free-running hardware counter that wraps
//! to zero on overflow. Timers built on top of these traits stay correct
//! across the wrap as long as they are polled often enough.

use core::fmt::Debug;

/// Unsigned integer usable as a tick value
///
/// Implemented for the register widths found on supported hardware.
/// All arithmetic on tick values is modular, so a narrower width trades
/// range for a cheaper counter read.
pub trait TickCount: Copy + PartialEq + Eq + PartialOrd + Ord + Debug {
    /// The value `0`.
    const ZERO: Self;

    /// All bits set to `1`. Also the modulus minus one.
    const MAX: Self;

    /// Addition modulo `MAX + 1`.
    fn wrapping_add(self, other: Self) -> Self;

    /// Subtraction modulo `MAX + 1`.
    fn wrapping_sub(self, other: Self) -> Self;
}

macro_rules! impl_tick_count {
    ($t:ty) => {
        impl TickCount for $t {
            const ZERO: Self = 0;
            const MAX: Self = <$t>::MAX;

            fn wrapping_add(self, other: Self) -> Self {
                <$t>::wrapping_add(self, other)
            }

            fn wrapping_sub(self, other: Self) -> Self {
                <$t>::wrapping_sub(self, other)
            }
        }
    };
}

impl_tick_count!(u8);
impl_tick_count!(u16);
impl_tick_count!(u32);

/// Free-running tick counter
///
/// Implementations read a hardware counter that increments at a fixed rate
/// and wraps to zero after [`TickCount::MAX`]. The read must not block and
/// must be safe to call from any context.
pub trait TickSource {
    /// Width of the underlying counter
    type Tick: TickCount;

    /// Current counter value
    fn now(&self) -> Self::Tick;
}
