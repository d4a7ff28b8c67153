//! Capability traits for the rail and rotation axes.
//!
//! The motion engine is written against these traits so that the calibration
//! and planning logic can be exercised without hardware attached.

use thiserror::Error;

/// Errors raised by a hardware backend.
///
/// Backends translate their own failure types (GPIO line I/O, bus errors)
/// into this one so the engine can propagate them without knowing which
/// backend is in use.
#[derive(Error, Debug)]
pub enum HardwareError {
    /// Low-level I/O failure talking to the device.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure with a human-readable description.
    #[error("{0}")]
    Backend(String),
}

impl HardwareError {
    /// Wrap an arbitrary backend error with context about which line failed.
    pub fn backend(context: &str, err: impl std::fmt::Display) -> Self {
        HardwareError::Backend(format!("{context}: {err}"))
    }
}

/// Linear axis I/O: one stepper motor plus three binary sensors.
///
/// A `step` call advances exactly one physical pulse and blocks for the
/// mechanical settle time before returning. The boolean direction is the
/// raw signal presented to the motor driver; the mapping between it and
/// "increasing location" is discovered at homing time and owned by the
/// engine, not the driver.
pub trait RailIo {
    /// Enable or disable the motor driver.
    ///
    /// Disabled motors hold no torque; the engine disables the driver at the
    /// end of every move so the cart can be repositioned by hand when idle.
    fn set_motor_enabled(&mut self, enabled: bool) -> Result<(), HardwareError>;

    /// Advance one physical pulse in the given direction, blocking for the
    /// pulse width and inter-pulse dwell.
    fn step(&mut self, direction: bool) -> Result<(), HardwareError>;

    /// Instantaneous state of boundary switch A.
    fn boundary_a(&mut self) -> Result<bool, HardwareError>;

    /// Instantaneous state of boundary switch B.
    fn boundary_b(&mut self) -> Result<bool, HardwareError>;

    /// Instantaneous state of the index-marker sensor.
    fn marker(&mut self) -> Result<bool, HardwareError>;
}

/// Rotation axis I/O: one angular micro-step per call.
///
/// The driver owns the coil phase sequence; callers only choose the sense
/// of rotation.
pub trait RotaryIo {
    /// Advance one angular micro-step, blocking for the step dwell.
    fn rotate_step(&mut self, clockwise: bool) -> Result<(), HardwareError>;

    /// De-energize the rotation coils.
    ///
    /// Called after a move completes so the motor does not sit energized
    /// between captures.
    fn release(&mut self) -> Result<(), HardwareError>;
}
