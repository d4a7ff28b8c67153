//! Hardware access for the camera rail rig.
//!
//! This crate defines the capability traits the motion engine is written
//! against ([`RailIo`], [`RotaryIo`]) and provides two implementations:
//!
//! - `gpio`: gpiod-backed stepper and sensor drivers for the real rig
//!   (Linux only, behind the `gpio` feature)
//! - [`sim`]: a deterministic software rail used by tests and dry runs
//!
//! The traits deliberately expose only what the engine consumes: a blocking
//! single-pulse step primitive, motor enable control, and instantaneous
//! binary sensor reads. Pulse timing (width and inter-pulse dwell) is the
//! driver's concern, not the engine's.

pub mod rail_interface;
pub mod sim;

#[cfg(all(target_os = "linux", feature = "gpio"))]
pub mod gpio;

pub use rail_interface::{HardwareError, RailIo, RotaryIo};
