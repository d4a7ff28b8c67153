//! Boundary homing sequencer.
//!
//! Homing reconstructs the rail's geometry from nothing but binary sensor
//! transitions: drive until either boundary switch fires (that end becomes
//! home), back off to clear the switch, then sweep the full length toward
//! the other switch while logging marker activations. The outward sweep's
//! measured travel is the envelope; its physical direction becomes, by
//! convention, "increasing location".

use tracing::{debug, info, warn};

use hardware::RailIo;

use crate::cluster::cluster;
use crate::error::{RigError, RigResult};
use crate::tracker::LinearAxis;

/// Physical direction used for the first homing sweep. The outward sweep,
/// and therefore the direction convention, is its opposite.
const FIRST_SWEEP_DIRECTION: bool = true;

/// Which boundary switch fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Boundary switch A.
    A,
    /// Boundary switch B.
    B,
}

impl Boundary {
    fn other(self) -> Boundary {
        match self {
            Boundary::A => Boundary::B,
            Boundary::B => Boundary::A,
        }
    }
}

/// Result of a completed homing pass.
#[derive(Debug, Clone)]
pub struct HomingOutcome {
    /// Envelope length: travel measured on the outward sweep.
    pub max_steps: u32,
    /// Physical direction that increases location (the outward sweep's).
    pub direction_increase: bool,
    /// Boundary that fired first and now sits at location 0.
    pub home_boundary: Boundary,
    /// Location the cart rests at after the final backoff.
    pub resting_location: u32,
    /// Clustered marker index → location mapping. May be empty; callers
    /// must treat "no positions found" as its own reportable condition.
    pub positions: std::collections::BTreeMap<u32, u32>,
}

struct Sweep {
    boundary: Boundary,
    traveled: u32,
    pulses: Vec<u32>,
}

impl<R: RailIo> LinearAxis<R> {
    /// Drive to both physical ends to establish zero, envelope length, and
    /// the direction convention, then cluster the marker pulses collected
    /// on the outward sweep.
    ///
    /// On failure no state is committed: the axis is left unhomed (its
    /// location genuinely unknown after partial sweeps), the stored record
    /// removed, and the motor driver disabled.
    pub fn home(&mut self) -> RigResult<HomingOutcome> {
        let ceiling = self.config.ceiling();
        info!("Homing: ceiling {ceiling} steps, backoff {}", self.config.backoff_steps);

        // Former calibration, in memory and on disk, is stale the moment
        // the first pulse physically moves the cart. The record is removed
        // up front so an aborted or crashed homing leaves nothing for a
        // later startup to adopt.
        self.max_steps = None;
        self.direction_increase = None;
        self.cur_location = None;
        self.positions.clear();
        self.store().clear()?;

        self.io.set_motor_enabled(true)?;
        let outcome = self.run_homing(ceiling);
        if let Err(e) = self.io.set_motor_enabled(false) {
            warn!("Failed to disable motor driver after homing: {e}");
        }
        let outcome = outcome?;

        self.max_steps = Some(outcome.max_steps);
        self.direction_increase = Some(outcome.direction_increase);
        self.cur_location = Some(outcome.resting_location);
        self.positions = outcome.positions.clone();
        self.persist()?;

        info!(
            "Homed: envelope {} steps, {} marker positions, resting at {}",
            outcome.max_steps,
            outcome.positions.len(),
            outcome.resting_location
        );
        Ok(outcome)
    }

    fn run_homing(&mut self, ceiling: u32) -> RigResult<HomingOutcome> {
        let first = self.sweep_to_boundary(FIRST_SWEEP_DIRECTION, ceiling, None)?;
        let home_boundary = first.boundary;
        debug!(
            "Home boundary {home_boundary:?} after {} steps; backing off",
            first.traveled
        );
        self.backoff(FIRST_SWEEP_DIRECTION)?;

        let outward = !FIRST_SWEEP_DIRECTION;
        let second = self.sweep_to_boundary(outward, ceiling, Some(home_boundary))?;
        debug!(
            "Far boundary {:?} after {} steps with {} marker pulses; backing off",
            second.boundary,
            second.traveled,
            second.pulses.len()
        );
        self.backoff(outward)?;

        let max_steps = second.traveled;
        if max_steps <= self.config.backoff_steps {
            return Err(RigError::InvalidConfig(format!(
                "measured envelope ({max_steps} steps) is not larger than the backoff \
                 ({}); the switches are too close together",
                self.config.backoff_steps
            )));
        }

        let positions = cluster(&second.pulses, self.config.marker_tolerance);
        if positions.is_empty() {
            warn!("Homing sweep observed no marker pulses");
        }

        Ok(HomingOutcome {
            max_steps,
            direction_increase: outward,
            home_boundary,
            resting_location: max_steps - self.config.backoff_steps,
            positions,
        })
    }

    /// Drive in `direction` until a boundary fires, sampling sensors every
    /// `sample_interval` pulses.
    ///
    /// With `home` unset (first sweep) either boundary terminates the
    /// sweep. With `home` set (outward sweep) only the *other* boundary
    /// terminates it; the home boundary re-firing means both limits share
    /// one sensor, and marker activations are logged along the way.
    fn sweep_to_boundary(
        &mut self,
        direction: bool,
        ceiling: u32,
        home: Option<Boundary>,
    ) -> RigResult<Sweep> {
        let mut pulses = Vec::new();
        let mut traveled = 0u32;

        while traveled < ceiling {
            self.io.step(direction)?;
            traveled += 1;
            if traveled % self.config.sample_interval != 0 {
                continue;
            }

            let a = self.io.boundary_a()?;
            let b = self.io.boundary_b()?;
            match home {
                None => {
                    if a || b {
                        let boundary = if a { Boundary::A } else { Boundary::B };
                        return Ok(Sweep {
                            boundary,
                            traveled,
                            pulses,
                        });
                    }
                }
                Some(home_boundary) => {
                    let (home_hit, other_hit) = match home_boundary {
                        Boundary::A => (a, b),
                        Boundary::B => (b, a),
                    };
                    if other_hit {
                        return Ok(Sweep {
                            boundary: home_boundary.other(),
                            traveled,
                            pulses,
                        });
                    }
                    if home_hit {
                        return Err(RigError::SharedBoundarySensor { traveled });
                    }
                    if self.io.marker()? {
                        pulses.push(traveled);
                    }
                }
            }
        }

        Err(RigError::TravelLimitExceeded { ceiling })
    }

    /// Reverse a fixed number of pulses to clear a triggered switch.
    fn backoff(&mut self, sweep_direction: bool) -> RigResult<()> {
        for _ in 0..self.config.backoff_steps {
            self.io.step(!sweep_direction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;
    use crate::config::RailConfig;
    use hardware::sim::SimRail;
    use tempfile::tempdir;

    fn axis_with(dir: &tempfile::TempDir, rail: SimRail, ceiling: u32) -> LinearAxis<SimRail> {
        let store = CalibrationStore::new(dir.path().join("calibration.json"));
        let config = RailConfig {
            travel_ceiling: Some(ceiling),
            ..RailConfig::default()
        };
        LinearAxis::new(rail, config, store)
    }

    /// Cart at 400; switch A active from 520 up, switch B from 50 down.
    /// First sweep (+1) hits A after 120 steps, backoff leaves the cart at
    /// 480 = location 0; the outward sweep (-1) reaches B after 430 steps.
    fn scenario_rail() -> SimRail {
        SimRail::new(400)
            .with_boundary_a(520, 600)
            .with_boundary_b(-100, 50)
    }

    #[test]
    fn two_sweep_homing_establishes_envelope() {
        let dir = tempdir().unwrap();
        let mut axis = axis_with(&dir, scenario_rail(), 5_000);

        let outcome = axis.home().unwrap();
        assert_eq!(outcome.max_steps, 430);
        assert_eq!(outcome.home_boundary, Boundary::A);
        // convention: the outward sweep's physical direction increases location
        assert!(!outcome.direction_increase);
        assert_eq!(outcome.resting_location, 390);

        assert_eq!(axis.max_steps(), Some(430));
        assert_eq!(axis.cur_location(), Some(390));
        assert!(!axis.io().motor_enabled());
        // physical check: location 390 is 480 - 390 = 90 on the track
        assert_eq!(axis.io().position(), 90);
    }

    #[test]
    fn homing_collects_and_clusters_markers() {
        // markers centered at track 370 and 180: locations 110 and 300
        let dir = tempdir().unwrap();
        let rail = scenario_rail().with_marker(368, 372).with_marker(178, 182);
        let mut axis = axis_with(&dir, rail, 5_000);

        let outcome = axis.home().unwrap();
        assert_eq!(outcome.positions.len(), 2);
        // sampled every 5 steps inside a ±2 zone; representative within it
        let first = outcome.positions[&0];
        let second = outcome.positions[&1];
        assert!((108..=112).contains(&first), "first marker at {first}");
        assert!((298..=302).contains(&second), "second marker at {second}");

        // moves after homing land back on the markers
        axis.move_to_index(0).unwrap();
        let track = axis.io().position();
        assert!((368..=372).contains(&track), "cart at track {track}");
    }

    #[test]
    fn homing_persists_record() {
        let dir = tempdir().unwrap();
        let mut axis = axis_with(&dir, scenario_rail(), 5_000);
        axis.home().unwrap();

        let record = axis.store().load().unwrap().unwrap();
        assert_eq!(record.max_steps, 430);
        assert_eq!(record.cur_location, 390);
        assert!(!record.direction_sign);
    }

    #[test]
    fn ceiling_overrun_fails_with_motor_disabled() {
        let dir = tempdir().unwrap();
        // no switches anywhere
        let mut axis = axis_with(&dir, SimRail::new(0), 300);

        assert!(matches!(
            axis.home(),
            Err(RigError::TravelLimitExceeded { ceiling: 300 })
        ));
        assert!(!axis.io().motor_enabled());
        assert!(!axis.is_homed());
    }

    #[test]
    fn shared_sensor_detected_on_outward_sweep() {
        let dir = tempdir().unwrap();
        // switch A both at the top and across the bottom: the outward sweep
        // sees the home sensor fire again
        let rail = SimRail::new(400)
            .with_boundary_a(520, 600)
            .with_obstruction_after(400);
        let mut axis = axis_with(&dir, rail, 5_000);

        assert!(matches!(
            axis.home(),
            Err(RigError::SharedBoundarySensor { .. })
        ));
        assert!(!axis.is_homed());
    }

    #[test]
    fn failed_homing_discards_previous_calibration() {
        let dir = tempdir().unwrap();
        let mut axis = axis_with(&dir, scenario_rail(), 5_000);
        axis.home().unwrap();
        assert!(axis.is_homed());

        // re-home against a rail that never finds the far boundary
        axis.io = SimRail::new(0);
        assert!(axis.home().is_err());
        assert!(!axis.is_homed());
        assert!(matches!(
            axis.move_to_absolute(10),
            Err(RigError::NotHomed)
        ));
    }

    #[test]
    fn failed_homing_removes_stored_record() {
        let dir = tempdir().unwrap();
        let mut axis = axis_with(&dir, scenario_rail(), 5_000);
        axis.home().unwrap();
        assert!(axis.store().load().unwrap().is_some());

        // The failed sweep still moves the cart, so the old record's
        // location no longer matches the physical position. Nothing may
        // survive on disk for a later startup to adopt.
        axis.config.travel_ceiling = Some(60);
        let before = axis.io().position();
        assert!(matches!(
            axis.home(),
            Err(RigError::TravelLimitExceeded { ceiling: 60 })
        ));
        assert_ne!(axis.io().position(), before);
        assert!(axis.store().load().unwrap().is_none());
    }
}
