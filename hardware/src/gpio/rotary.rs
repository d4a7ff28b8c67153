//! Four-coil unipolar stepper driver for the rotation mount.

use std::thread;
use std::time::Duration;

use gpiod::{Chip, Lines, Options, Output};
use tracing::debug;

use crate::rail_interface::{HardwareError, RotaryIo};

/// Half-step drive sequence for a unipolar stepper (e.g. 28BYJ-48).
///
/// Consecutive rows energize overlapping coil pairs; stepping through the
/// table forward rotates one way, backward the other.
const HALF_STEP_SEQUENCE: [[bool; 4]; 8] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

/// Rotation mount driver over four gpiod coil lines.
pub struct GpioRotary {
    coils: Lines<Output>,
    phase: usize,
    dwell: Duration,
}

impl GpioRotary {
    /// Open the four coil lines on the given GPIO chip.
    ///
    /// `dwell` is the hold time per micro-step; it sets the rotation speed
    /// (a 4096 step/rev motor at 5 RPM wants about 2.9 ms).
    pub fn open(chip_name: &str, coil_pins: [u32; 4], dwell: Duration) -> Result<Self, HardwareError> {
        let chip = Chip::new(chip_name)
            .map_err(|e| HardwareError::backend("open GPIO chip", e))?;
        let coils = chip
            .request_lines(
                Options::output(coil_pins)
                    .values([false; 4])
                    .consumer("rig-rotate"),
            )
            .map_err(|e| HardwareError::backend("request coil lines", e))?;

        debug!("Rotation coils requested on {chip_name}: {coil_pins:?}");

        Ok(Self {
            coils,
            phase: 0,
            dwell,
        })
    }
}

impl RotaryIo for GpioRotary {
    fn rotate_step(&mut self, clockwise: bool) -> Result<(), HardwareError> {
        self.phase = if clockwise {
            (self.phase + 1) % HALF_STEP_SEQUENCE.len()
        } else {
            (self.phase + HALF_STEP_SEQUENCE.len() - 1) % HALF_STEP_SEQUENCE.len()
        };
        self.coils
            .set_values(HALF_STEP_SEQUENCE[self.phase])
            .map_err(|e| HardwareError::backend("set coil lines", e))?;
        thread::sleep(self.dwell);
        Ok(())
    }

    fn release(&mut self) -> Result<(), HardwareError> {
        self.coils
            .set_values([false; 4])
            .map_err(|e| HardwareError::backend("clear coil lines", e))
    }
}
