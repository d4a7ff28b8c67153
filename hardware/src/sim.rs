//! Software rail for tests and dry runs.
//!
//! Models the track as a one-dimensional integer coordinate. A `step(true)`
//! moves the cart to `position + 1`; `step(false)` to `position - 1`. Switch
//! and marker sensors are inclusive coordinate zones, so sweeps observe the
//! same multi-sample activations a real hall sensor produces.

use crate::rail_interface::{HardwareError, RailIo, RotaryIo};

/// Deterministic in-memory rail.
#[derive(Debug, Clone)]
pub struct SimRail {
    position: i64,
    motor_enabled: bool,
    total_steps: u64,
    a_zone: Option<(i64, i64)>,
    b_zone: Option<(i64, i64)>,
    marker_zones: Vec<(i64, i64)>,
    /// Boundary A latches active once this many total steps have been taken,
    /// regardless of position. Used to inject mid-move obstructions.
    latch_a_after: Option<u64>,
}

impl SimRail {
    /// Create a rail with the cart at the given track coordinate and no
    /// sensors configured.
    pub fn new(start_position: i64) -> Self {
        Self {
            position: start_position,
            motor_enabled: false,
            total_steps: 0,
            a_zone: None,
            b_zone: None,
            marker_zones: Vec::new(),
            latch_a_after: None,
        }
    }

    /// Boundary switch A reads active inside `[lo, hi]`.
    pub fn with_boundary_a(mut self, lo: i64, hi: i64) -> Self {
        self.a_zone = Some((lo, hi));
        self
    }

    /// Boundary switch B reads active inside `[lo, hi]`.
    pub fn with_boundary_b(mut self, lo: i64, hi: i64) -> Self {
        self.b_zone = Some((lo, hi));
        self
    }

    /// Add an index-marker zone active inside `[lo, hi]`.
    pub fn with_marker(mut self, lo: i64, hi: i64) -> Self {
        self.marker_zones.push((lo, hi));
        self
    }

    /// Latch boundary A active after `steps` total pulses, simulating an
    /// obstruction appearing mid-move.
    pub fn with_obstruction_after(mut self, steps: u64) -> Self {
        self.latch_a_after = Some(steps);
        self
    }

    /// Current track coordinate of the cart.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Total pulses issued since construction.
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Whether the motor driver is currently enabled.
    pub fn motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    fn in_zone(zone: Option<(i64, i64)>, position: i64) -> bool {
        zone.is_some_and(|(lo, hi)| position >= lo && position <= hi)
    }

    fn obstructed(&self) -> bool {
        self.latch_a_after
            .is_some_and(|after| self.total_steps >= after)
    }
}

impl RailIo for SimRail {
    fn set_motor_enabled(&mut self, enabled: bool) -> Result<(), HardwareError> {
        self.motor_enabled = enabled;
        Ok(())
    }

    fn step(&mut self, direction: bool) -> Result<(), HardwareError> {
        self.position += if direction { 1 } else { -1 };
        self.total_steps += 1;
        Ok(())
    }

    fn boundary_a(&mut self) -> Result<bool, HardwareError> {
        Ok(Self::in_zone(self.a_zone, self.position) || self.obstructed())
    }

    fn boundary_b(&mut self) -> Result<bool, HardwareError> {
        Ok(Self::in_zone(self.b_zone, self.position))
    }

    fn marker(&mut self) -> Result<bool, HardwareError> {
        Ok(self
            .marker_zones
            .iter()
            .any(|&(lo, hi)| self.position >= lo && self.position <= hi))
    }
}

/// Step-counting rotation axis.
#[derive(Debug, Clone, Default)]
pub struct SimRotary {
    steps_cw: u64,
    steps_ccw: u64,
    released: bool,
}

impl SimRotary {
    /// Create a rotary axis with no steps taken.
    pub fn new() -> Self {
        Self::default()
    }

    /// Micro-steps taken clockwise.
    pub fn steps_cw(&self) -> u64 {
        self.steps_cw
    }

    /// Micro-steps taken counter-clockwise.
    pub fn steps_ccw(&self) -> u64 {
        self.steps_ccw
    }

    /// Net micro-step displacement (clockwise positive).
    pub fn net_steps(&self) -> i64 {
        self.steps_cw as i64 - self.steps_ccw as i64
    }

    /// Whether the coils were released after the last move.
    pub fn released(&self) -> bool {
        self.released
    }
}

impl RotaryIo for SimRotary {
    fn rotate_step(&mut self, clockwise: bool) -> Result<(), HardwareError> {
        if clockwise {
            self.steps_cw += 1;
        } else {
            self.steps_ccw += 1;
        }
        self.released = false;
        Ok(())
    }

    fn release(&mut self) -> Result<(), HardwareError> {
        self.released = true;
        Ok(())
    }
}
