//! Absolute position tracking for the linear rail.
//!
//! The rail has no absolute encoder; [`LinearAxis`] reconstructs location by
//! counting pulses from the homing-established zero and re-persists a
//! calibration snapshot after every committed move so a restart can resume
//! from the last known-good position.

use std::collections::BTreeMap;

use hardware::RailIo;
use tracing::{debug, warn};

use crate::calibration::{CalibrationRecord, CalibrationStore};
use crate::config::RailConfig;
use crate::error::{RigError, RigResult};

/// The linear axis: travel envelope, current location, and index mapping.
///
/// Owns the envelope exclusively. Every committed move leaves the location
/// inside `[0, max_steps]`; an aborted move commits the actual steps
/// completed, never the intended target.
pub struct LinearAxis<R: RailIo> {
    pub(crate) io: R,
    pub(crate) config: RailConfig,
    store: CalibrationStore,
    pub(crate) max_steps: Option<u32>,
    pub(crate) direction_increase: Option<bool>,
    pub(crate) cur_location: Option<u32>,
    pub(crate) positions: BTreeMap<u32, u32>,
}

impl<R: RailIo> LinearAxis<R> {
    /// Create an unhomed axis over the given I/O backend.
    pub fn new(io: R, config: RailConfig, store: CalibrationStore) -> Self {
        Self {
            io,
            config,
            store,
            max_steps: None,
            direction_increase: None,
            cur_location: None,
            positions: BTreeMap::new(),
        }
    }

    /// Whether envelope, direction convention, and location are all known.
    pub fn is_homed(&self) -> bool {
        self.max_steps.is_some() && self.direction_increase.is_some() && self.cur_location.is_some()
    }

    /// Current absolute location, if known.
    pub fn cur_location(&self) -> Option<u32> {
        self.cur_location
    }

    /// Envelope length in steps, if established.
    pub fn max_steps(&self) -> Option<u32> {
        self.max_steps
    }

    /// Physical step direction that increases location, if established.
    pub fn direction_increase(&self) -> Option<bool> {
        self.direction_increase
    }

    /// Marker index → location mapping from the last homing pass.
    pub fn positions(&self) -> &BTreeMap<u32, u32> {
        &self.positions
    }

    /// The I/O backend (read access, for diagnostics and tests).
    pub fn io(&self) -> &R {
        &self.io
    }

    /// The calibration store backing this axis.
    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    /// Adopt a previously persisted calibration record in place of homing.
    pub fn adopt_record(&mut self, record: CalibrationRecord) {
        debug!(
            "Adopting calibration record: envelope {} steps, {} positions, at {}",
            record.max_steps,
            record.positions.len(),
            record.cur_location
        );
        self.max_steps = Some(record.max_steps);
        self.direction_increase = Some(record.direction_sign);
        self.cur_location = Some(record.cur_location);
        self.positions = record.positions;
    }

    fn require_homed(&self) -> RigResult<(u32, u32, bool)> {
        match (self.cur_location, self.max_steps, self.direction_increase) {
            (Some(cur), Some(max), Some(dir)) => Ok((cur, max, dir)),
            _ => Err(RigError::NotHomed),
        }
    }

    /// Persist the current state as a calibration record.
    pub(crate) fn persist(&self) -> RigResult<()> {
        let (cur, max, dir) = self.require_homed()?;
        self.store.save(&CalibrationRecord {
            positions: self.positions.clone(),
            cur_location: cur,
            direction_sign: dir,
            max_steps: max,
        })
    }

    /// Move a number of steps in a physical direction.
    ///
    /// The target is bounds-checked before any motion; an out-of-range
    /// target fails with no pulses issued. Mid-move, the boundary sensors
    /// are sampled every `sample_interval` pulses; if either fires the move
    /// aborts with [`RigError::UnexpectedObstruction`] and the partial
    /// location reached is committed; partial progress is real physical
    /// state. A snapshot is persisted before returning in either case.
    pub fn move_relative(&mut self, steps: u32, direction: bool) -> RigResult<()> {
        let (cur, max_steps, dir_increase) = self.require_homed()?;

        let sign: i64 = if direction == dir_increase { 1 } else { -1 };
        let target = cur as i64 + sign * steps as i64;
        if target < 0 || target > max_steps as i64 {
            return Err(RigError::OutOfBounds {
                current: cur,
                target,
                max_steps,
            });
        }
        let target = target as u32;
        debug!("move_relative: {cur} -> {target} ({steps} steps, direction {direction})");

        self.io.set_motor_enabled(true)?;
        let outcome = self.pulse_loop(steps, direction, sign, target);
        if let Err(e) = self.io.set_motor_enabled(false) {
            warn!("Failed to disable motor driver after move: {e}");
        }
        match self.persist() {
            Ok(()) => {}
            Err(e) if outcome.is_ok() => return Err(e),
            Err(e) => warn!("Failed to persist snapshot after aborted move: {e}"),
        }
        outcome
    }

    fn pulse_loop(&mut self, steps: u32, direction: bool, sign: i64, target: u32) -> RigResult<()> {
        let mut location = match self.cur_location {
            Some(cur) => cur,
            None => return Err(RigError::NotHomed),
        };

        for pulse in 1..=steps {
            self.io.step(direction)?;
            location = (location as i64 + sign) as u32;
            self.cur_location = Some(location);

            if pulse % self.config.sample_interval == 0
                && (self.io.boundary_a()? || self.io.boundary_b()?)
            {
                return Err(RigError::UnexpectedObstruction { location, target });
            }
        }
        Ok(())
    }

    /// Move to an absolute location.
    ///
    /// Requires a known direction convention (homing has occurred or a
    /// record was adopted); fails with [`RigError::NotHomed`] otherwise.
    /// Accepts a signed target so callers with computed offsets get a
    /// proper [`RigError::OutOfBounds`] instead of a silent clamp.
    pub fn move_to_absolute(&mut self, target: i64) -> RigResult<()> {
        let (cur, max_steps, dir_increase) = self.require_homed()?;
        if target < 0 || target > max_steps as i64 {
            return Err(RigError::OutOfBounds {
                current: cur,
                target,
                max_steps,
            });
        }
        let target = target as u32;

        let steps = cur.abs_diff(target);
        let direction = if target >= cur {
            dir_increase
        } else {
            !dir_increase
        };
        self.move_relative(steps, direction)
    }

    /// Move to a marker index from the position mapping.
    ///
    /// Returns the location moved to. After arriving, the marker sensor is
    /// checked as a sanity diagnostic; a miss is logged, not failed, since
    /// the representative location may sit just outside a narrow marker.
    pub fn move_to_index(&mut self, index: u32) -> RigResult<u32> {
        let location = match self.positions.get(&index) {
            Some(&location) => location,
            None => {
                return Err(RigError::IndexNotFound {
                    index,
                    count: self.positions.len(),
                })
            }
        };
        self.move_to_absolute(location as i64)?;

        if !self.io.marker()? {
            warn!("Marker sensor inactive after moving to index {index} at {location}");
        }
        Ok(location)
    }
}
