//! Rotating mount control.

use tracing::{debug, warn};

use hardware::RotaryIo;

use crate::config::RotationConfig;
use crate::error::RigResult;

/// Micro-steps per half-step drive cycle. Targets are quantized to a whole
/// cycle so the coil pattern always returns to its base phase.
const DRIVE_CYCLE: u32 = 8;

/// Geared stepper driving the camera mount, tracked in micro-steps from the
/// power-on heading.
///
/// The mount has no encoder or home switch. Heading zero is wherever the
/// mount pointed at construction, and all positions are dead-reckoned from
/// the steps issued since.
#[derive(Debug)]
pub struct Rotator<T: RotaryIo> {
    io: T,
    config: RotationConfig,
    /// Current heading in micro-steps, in `[0, steps_per_rev)`.
    heading: u32,
}

impl<T: RotaryIo> Rotator<T> {
    pub fn new(io: T, config: RotationConfig) -> Self {
        Self {
            io,
            config,
            heading: 0,
        }
    }

    /// Current heading in micro-steps from the power-on position.
    pub fn heading_steps(&self) -> u32 {
        self.heading
    }

    /// Current heading in degrees.
    pub fn heading_degrees(&self) -> f64 {
        f64::from(self.heading) * self.config.deg_per_step
    }

    /// Access the underlying rotation axis.
    pub fn io(&self) -> &T {
        &self.io
    }

    /// Quantize an angle in degrees to the nearest whole drive cycle at or
    /// below it, normalized into one revolution.
    fn quantize(&self, degrees: f64) -> u32 {
        let spr = self.config.steps_per_rev();
        let raw = (degrees.rem_euclid(360.0) / self.config.deg_per_step) as u32;
        (raw / DRIVE_CYCLE * DRIVE_CYCLE) % spr
    }

    /// Rotate to an absolute heading in degrees, taking the shorter arc.
    pub fn move_to(&mut self, degrees: f64) -> RigResult<()> {
        let spr = self.config.steps_per_rev();
        let target = self.quantize(degrees);
        let forward = (target + spr - self.heading) % spr;

        let (steps, clockwise) = if forward > spr / 2 {
            (spr - forward, false)
        } else {
            (forward, true)
        };
        debug!(
            "Rotating {steps} steps {} to {degrees:.2} deg (quantized {target})",
            if clockwise { "cw" } else { "ccw" }
        );

        for _ in 0..steps {
            self.io.rotate_step(clockwise)?;
        }
        self.heading = target;
        Ok(())
    }

    /// De-energize the coils, leaving the mount free. The heading remains
    /// tracked; a load that back-drives the gearbox will desync it.
    pub fn release(&mut self) -> RigResult<()> {
        if let Err(e) = self.io.release() {
            warn!("Failed to release rotator coils: {e}");
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hardware::sim::SimRotary;

    fn rotator() -> Rotator<SimRotary> {
        Rotator::new(SimRotary::new(), RotationConfig::default())
    }

    #[test]
    fn small_angle_goes_clockwise() {
        let mut rot = rotator();
        rot.move_to(5.0).unwrap();
        // 5 deg / (5.625/64) = 56.89 steps, floored to the 56-step cycle
        assert_eq!(rot.io().steps_cw(), 56);
        assert_eq!(rot.io().steps_ccw(), 0);
        assert_eq!(rot.heading_steps(), 56);
        assert_relative_eq!(rot.heading_degrees(), 4.921875, epsilon = 1e-9);
    }

    #[test]
    fn return_to_zero_reverses() {
        let mut rot = rotator();
        rot.move_to(5.0).unwrap();
        rot.move_to(0.0).unwrap();
        assert_eq!(rot.io().steps_ccw(), 56);
        assert_eq!(rot.io().net_steps(), 0);
        assert_eq!(rot.heading_steps(), 0);
    }

    #[test]
    fn large_angle_takes_shorter_arc() {
        let mut rot = rotator();
        // 355 deg quantizes to 4032 steps: 64 counter-clockwise, not 4032 cw
        rot.move_to(355.0).unwrap();
        assert_eq!(rot.io().steps_cw(), 0);
        assert_eq!(rot.io().steps_ccw(), 64);
        assert_eq!(rot.heading_steps(), 4032);
    }

    #[test]
    fn negative_angles_normalize() {
        let mut a = rotator();
        let mut b = rotator();
        a.move_to(-5.0).unwrap();
        b.move_to(355.0).unwrap();
        assert_eq!(a.heading_steps(), b.heading_steps());
    }

    #[test]
    fn targets_snap_to_drive_cycle() {
        let mut rot = rotator();
        rot.move_to(0.4).unwrap();
        // under half a cycle rounds away entirely
        assert_eq!(rot.heading_steps(), 0);
        rot.move_to(1.0).unwrap();
        assert_eq!(rot.heading_steps() % DRIVE_CYCLE, 0);
    }

    #[test]
    fn release_marks_coils_free() {
        let mut rot = rotator();
        rot.move_to(10.0).unwrap();
        assert!(!rot.io().released());
        rot.release().unwrap();
        assert!(rot.io().released());
    }
}
