//! STEP/DIR/ENABLE stepper driver plus boundary and marker inputs.

use std::thread;
use std::time::Duration;

use gpiod::{Chip, Input, Lines, Options, Output};
use tracing::debug;

use crate::rail_interface::{HardwareError, RailIo};

/// GPIO line offsets for the rail axis.
#[derive(Debug, Clone, Copy)]
pub struct RailPins {
    /// STEP pulse line.
    pub step: u32,
    /// DIR level line.
    pub dir: u32,
    /// Driver ENABLE line (active low on common driver boards).
    pub enable: u32,
    /// Boundary switch A input.
    pub boundary_a: u32,
    /// Boundary switch B input.
    pub boundary_b: u32,
    /// Hall-effect marker sensor input.
    pub marker: u32,
}

/// Pulse timing for the rail stepper.
#[derive(Debug, Clone, Copy)]
pub struct StepTiming {
    /// High time of the STEP pulse.
    pub pulse_width: Duration,
    /// Dwell between pulses; sets the mechanical speed.
    pub dwell: Duration,
}

impl Default for StepTiming {
    fn default() -> Self {
        Self {
            pulse_width: Duration::from_micros(1500),
            dwell: Duration::from_micros(5000),
        }
    }
}

/// Rail axis driver over gpiod lines.
pub struct GpioRail {
    step: Lines<Output>,
    dir: Lines<Output>,
    enable: Lines<Output>,
    boundary_a: Lines<Input>,
    boundary_b: Lines<Input>,
    marker: Lines<Input>,
    timing: StepTiming,
}

impl GpioRail {
    /// Open all rail lines on the given GPIO chip.
    ///
    /// The motor driver starts disabled; ENABLE is driven high (inactive)
    /// as soon as the line is requested.
    pub fn open(chip_name: &str, pins: RailPins, timing: StepTiming) -> Result<Self, HardwareError> {
        let chip = Chip::new(chip_name)
            .map_err(|e| HardwareError::backend("open GPIO chip", e))?;

        let step = chip
            .request_lines(Options::output([pins.step]).values([false]).consumer("rig-step"))
            .map_err(|e| HardwareError::backend("request STEP line", e))?;
        let dir = chip
            .request_lines(Options::output([pins.dir]).values([false]).consumer("rig-dir"))
            .map_err(|e| HardwareError::backend("request DIR line", e))?;
        // Active-low enable: high = driver off.
        let enable = chip
            .request_lines(Options::output([pins.enable]).values([true]).consumer("rig-enable"))
            .map_err(|e| HardwareError::backend("request ENABLE line", e))?;

        let boundary_a = chip
            .request_lines(Options::input([pins.boundary_a]).consumer("rig-bound-a"))
            .map_err(|e| HardwareError::backend("request boundary A line", e))?;
        let boundary_b = chip
            .request_lines(Options::input([pins.boundary_b]).consumer("rig-bound-b"))
            .map_err(|e| HardwareError::backend("request boundary B line", e))?;
        let marker = chip
            .request_lines(Options::input([pins.marker]).consumer("rig-marker"))
            .map_err(|e| HardwareError::backend("request marker line", e))?;

        debug!("Rail lines requested on {chip_name}: {pins:?}");

        Ok(Self {
            step,
            dir,
            enable,
            boundary_a,
            boundary_b,
            marker,
            timing,
        })
    }

    fn read_line(lines: &Lines<Input>, context: &str) -> Result<bool, HardwareError> {
        let values = lines
            .get_values([false])
            .map_err(|e| HardwareError::backend(context, e))?;
        Ok(values[0])
    }
}

impl RailIo for GpioRail {
    fn set_motor_enabled(&mut self, enabled: bool) -> Result<(), HardwareError> {
        self.enable
            .set_values([!enabled])
            .map_err(|e| HardwareError::backend("set ENABLE line", e))
    }

    fn step(&mut self, direction: bool) -> Result<(), HardwareError> {
        self.dir
            .set_values([direction])
            .map_err(|e| HardwareError::backend("set DIR line", e))?;
        self.step
            .set_values([true])
            .map_err(|e| HardwareError::backend("raise STEP line", e))?;
        thread::sleep(self.timing.pulse_width);
        self.step
            .set_values([false])
            .map_err(|e| HardwareError::backend("lower STEP line", e))?;
        thread::sleep(self.timing.dwell);
        Ok(())
    }

    fn boundary_a(&mut self) -> Result<bool, HardwareError> {
        Self::read_line(&self.boundary_a, "read boundary A")
    }

    fn boundary_b(&mut self) -> Result<bool, HardwareError> {
        Self::read_line(&self.boundary_b, "read boundary B")
    }

    fn marker(&mut self) -> Result<bool, HardwareError> {
        Self::read_line(&self.marker, "read marker")
    }
}
