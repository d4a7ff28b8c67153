//! gpiod-backed drivers for the rig's GPIO-wired hardware.
//!
//! The rail stepper uses a STEP/DIR/ENABLE driver board; the rotation motor
//! is a unipolar stepper driven directly through four coil lines with a
//! half-step sequence. Boundary switches and the hall-effect marker sensor
//! are plain input lines.
//!
//! All drivers open lines through the character-device GPIO interface
//! (`/dev/gpiochipN`), so they work on any Linux SBC without board-specific
//! pin tables.

mod rail;
mod rotary;

pub use rail::{GpioRail, RailPins, StepTiming};
pub use rotary::GpioRotary;
