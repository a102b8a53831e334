//! Calibration pattern generator
//!
//! Produces the same pattern as the stock first layer wizard: heaters on,
//! home, purge an intro line along the bed edge, print a five-pass meander,
//! then finish with a filled square and park. Extrusion amounts come from
//! volume math so the pattern stays correct for any layer height and
//! extrusion width the wizard asks for.

use core::f32::consts::PI;
use core::fmt::Write;

use heapless::String;

use super::{CommandSink, CMD_MAX};

/// Filament diameter in mm, the only size this machine takes
pub const FILAMENT_DIAMETER: f32 = 1.75;

/// Length of one short meander segment in mm
const SHORT_LENGTH: f32 = 20.0;

/// Length of one long meander pass in mm
const LONG_LENGTH: f32 = 150.0;

/// Side of the filled square in mm
const SQUARE_WIDTH: f32 = SHORT_LENGTH;

/// Filament length in mm that lays down one extrusion line
///
/// Models the line cross section as a rectangle with semicircular ends:
/// `(pi * h^2) / 4 + h * (w - h)`. Dividing by the filament cross section
/// converts deposited volume into feedstock length.
pub fn extrusion_length(
    layer_height: f32,
    extrusion_width: f32,
    length: f32,
    filament_diameter: f32,
) -> f32 {
    let line_area =
        (PI * layer_height * layer_height) / 4.0 + layer_height * (extrusion_width - layer_height);
    let filament_area = (PI * filament_diameter * filament_diameter) / 4.0;
    length * line_area / filament_area
}

/// Distance between adjacent line centers for full coverage
///
/// The semicircular line ends overlap by `h * (1 - pi/4)`, so lines sit
/// closer together than one extrusion width.
pub fn line_spacing(layer_height: f32, extrusion_width: f32) -> f32 {
    extrusion_width - layer_height * (1.0 - PI / 4.0)
}

/// First layer calibration pattern generator
///
/// One phase method per stage of the wizard, called in order:
/// [`preheat`](Self::preheat), [`intro_line`](Self::intro_line),
/// [`before_meander`](Self::before_meander),
/// [`meander_start`](Self::meander_start), [`meander`](Self::meander),
/// [`square`](Self::square), [`finish`](Self::finish). The wizard pauses
/// between phases while the user adjusts the Z offset.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirstLayerCal {
    /// Height of the calibration layer in mm
    layer_height: f32,
    /// Width of a single extruded line in mm
    extrusion_width: f32,
}

impl FirstLayerCal {
    /// Create a generator for the given layer geometry
    pub const fn new(layer_height: f32, extrusion_width: f32) -> Self {
        Self {
            layer_height,
            extrusion_width,
        }
    }

    /// Fan off, wait for bed and nozzle temperature, home, zero the extruder
    pub fn preheat<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        for cmd in ["M107", "M190", "M109", "G28", "G92E0"] {
            sink.push(cmd)?;
        }
        Ok(())
    }

    /// Purge line along the bed edge, thick then thin
    pub fn intro_line<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        sink.push("G1F1080")?;
        self.move_x(sink, 60.0, self.filament_for(self.extrusion_width * 4.0, 60.0))?;
        self.move_x(sink, 202.5, self.filament_for(self.extrusion_width * 8.0, 142.5))
    }

    /// Switch to relative extrusion, retract, and lift for the travel move
    pub fn before_meander<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        for cmd in [
            "G92E0",
            "G90",
            "M83",
            "G1E-1.5F2100",
            "G1Z5F7200",
            "M204S1000",
        ] {
            sink.push(cmd)?;
        }
        Ok(())
    }

    /// Travel to the pattern origin and lay the tapered lead-in
    ///
    /// The lead-in narrows in three steps from four widths down to one,
    /// landing at normal extrusion just before the meander proper.
    pub fn meander_start<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        sink.push("G1X50Y155")?;
        let mut line = String::<CMD_MAX>::new();
        let _ = write!(line, "G1Z{:.2}", self.layer_height);
        sink.push(&line)?;
        sink.push("G1F1080")?;
        sink.push("G91")?;
        self.move_x(sink, 25.0, self.filament_for(self.extrusion_width * 4.0, 25.0))?;
        self.move_x(sink, 25.0, self.filament_for(self.extrusion_width * 2.0, 25.0))?;
        self.move_x(sink, 100.0, self.filament_for(self.extrusion_width, 100.0))?;
        self.move_y(sink, -SHORT_LENGTH, self.filament_for(self.extrusion_width, SHORT_LENGTH))
    }

    /// Five full-width zig-zag passes
    pub fn meander<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        let long_extrusion = self.filament_for(self.extrusion_width, LONG_LENGTH);
        let short_extrusion = self.filament_for(self.extrusion_width, SHORT_LENGTH);

        let mut xdir = -1.0;
        for _ in 0..5 {
            self.move_x(sink, xdir * LONG_LENGTH, long_extrusion)?;
            self.move_y(sink, -SHORT_LENGTH, short_extrusion)?;
            xdir = -xdir;
        }
        Ok(())
    }

    /// Four perimeter passes filling the square top to bottom
    pub fn square<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        let y_spacing = line_spacing(self.layer_height, self.extrusion_width);
        let long_extrusion = self.filament_for(self.extrusion_width, SQUARE_WIDTH);
        let short_extrusion = self.filament_for(self.extrusion_width, y_spacing);

        for _ in 0..4 {
            self.move_x(sink, SQUARE_WIDTH, long_extrusion)?;
            self.move_y(sink, -y_spacing, short_extrusion)?;
            self.move_x(sink, -SQUARE_WIDTH, long_extrusion)?;
            self.move_y(sink, -y_spacing, short_extrusion)?;
        }
        Ok(())
    }

    /// Retract, heaters off, lift, park, and release the motors
    pub fn finish<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        for cmd in [
            "G90",
            "M107",
            "G1E-0.075F2100",
            "M140S0",
            "G1Z10F1300",
            "G1X10Y180F4000",
            "M104S0",
            "M84",
        ] {
            sink.push(cmd)?;
        }
        Ok(())
    }

    fn filament_for(&self, extrusion_width: f32, length: f32) -> f32 {
        extrusion_length(self.layer_height, extrusion_width, length, FILAMENT_DIAMETER)
    }

    fn move_x<S: CommandSink>(&self, sink: &mut S, x: f32, e: f32) -> Result<(), S::Error> {
        let mut line = String::<CMD_MAX>::new();
        let _ = write!(line, "G1X{x:.4}E{e:.4}");
        sink.push(&line)
    }

    fn move_y<S: CommandSink>(&self, sink: &mut S, y: f32, e: f32) -> Result<(), S::Error> {
        let mut line = String::<CMD_MAX>::new();
        let _ = write!(line, "G1Y{y:.4}E{e:.4}");
        sink.push(&line)
    }
}
