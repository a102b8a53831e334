//! Single-shot interval timers over a wrapping tick counter
//!
//! The control loop decides when heating, motion, and retry windows have
//! run out by polling these timers against the free-running tick counter.
//! All arithmetic is modular, so a counter rollover from the maximum value
//! back to zero does not disturb a timer that spans it.

use kairos_hal::tick::{TickCount, TickSource};

/// Single-shot interval timer
///
/// Started explicitly, then polled for expiration. The first poll that
/// observes the period elapsed reports it and stops the timer, so each
/// `start()` yields at most one `true` from [`expired`](Self::expired).
///
/// The tick width `T` bounds the measurable interval: a `u16` timer driven
/// by a millisecond counter covers about 65 seconds, a `u32` timer about
/// 49 days.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalTimer<T: TickCount> {
    /// Tick value captured by the most recent `start()`
    started: T,
    /// Whether an expiration is still pending
    running: bool,
}

/// Timer wide enough for intervals up to 49 days at one tick per millisecond
pub type LongTimer = IntervalTimer<u32>;

/// Timer for intervals under 65 seconds at one tick per millisecond
///
/// Half the RAM of a [`LongTimer`], which matters when dozens of retry
/// and debounce timers live in one control structure.
pub type ShortTimer = IntervalTimer<u16>;

impl<T: TickCount> Default for IntervalTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TickCount> IntervalTimer<T> {
    /// Create a timer in the not-running state
    ///
    /// A fresh timer reports not-expired and zero elapsed time until
    /// [`start`](Self::start) is called.
    pub const fn new() -> Self {
        Self {
            started: T::ZERO,
            running: false,
        }
    }

    /// Start or restart the timer
    ///
    /// Records the current tick value as the reference point. Any pending
    /// expiration from a previous `start()` is superseded.
    pub fn start(&mut self, ticks: &impl TickSource<Tick = T>) {
        self.started = ticks.now();
        self.running = true;
    }

    /// Poll for expiration, stopping the timer on the first hit
    ///
    /// Reports `true` the first time `period` ticks have passed since
    /// `start()`, then stops, so later polls report `false` until the
    /// timer is started again. A timer that was never started also
    /// reports `false`.
    ///
    /// Counter wraparound shortens how long an expiration stays
    /// observable: poll at least once every `T::MAX - period` ticks or
    /// the elapsed count wraps past the period and the hit is missed.
    pub fn expired(&mut self, ticks: &impl TickSource<Tick = T>, period: T) -> bool {
        if !self.running {
            return false;
        }
        let expired = ticks.now().wrapping_sub(self.started) >= period;
        if expired {
            self.running = false;
        }
        expired
    }

    /// Ticks since the timer was started, or zero if it is not running
    ///
    /// Modular subtraction keeps the count correct across one counter
    /// wraparound; beyond a full counter period the count aliases.
    pub fn elapsed(&self, ticks: &impl TickSource<Tick = T>) -> T {
        if self.running {
            ticks.now().wrapping_sub(self.started)
        } else {
            T::ZERO
        }
    }

    /// Poll for expiration, treating a stopped timer as expired
    ///
    /// Where [`expired`](Self::expired) reports each expiration once,
    /// this keeps reporting `true` for as long as the timer stays
    /// stopped, including for a timer that was never started. Callers
    /// use it for "do this no more often than" pacing, where a stopped
    /// timer means the action is due.
    pub fn expired_cont(&mut self, ticks: &impl TickSource<Tick = T>, period: T) -> bool {
        !self.running || self.expired(ticks, period)
    }
}
