//! First layer (Z offset) calibration
//!
//! Generates the G-code command sequence that prints the calibration
//! pattern: an intro purge line, a meander, and a filled square. The
//! commands go to a [`CommandSink`] one bounded line at a time, so the
//! generator itself never touches hardware and runs under host tests.

pub mod first_layer;

pub use first_layer::{extrusion_length, line_spacing, FirstLayerCal};

/// Longest command line the generator produces, with room to spare
pub const CMD_MAX: usize = 32;

/// Destination for generated command lines
///
/// Implementations range from the serial transmit path down to a plain
/// vector in tests. Pushes are ordered; a sink error aborts the phase
/// that produced it.
pub trait CommandSink {
    /// Error surfaced when the sink cannot accept a command
    type Error;

    /// Accept one complete command line, without line terminator
    fn push(&mut self, command: &str) -> Result<(), Self::Error>;
}
