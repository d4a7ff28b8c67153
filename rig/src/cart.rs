//! Rig orchestration.
//!
//! [`Cart`] owns both axes and the capture plan, and is the only way user
//! code touches the motors. Every operation borrows the cart mutably, so
//! motion is serialized by construction.

use serde::Serialize;
use tracing::{debug, info};

use hardware::{RailIo, RotaryIo};

use crate::calibration::CalibrationStore;
use crate::config::{BeltGeometry, RigConfig, ViewConfig};
use crate::error::RigResult;
use crate::homing::HomingOutcome;
use crate::planner::{create_instructions, Waypoint};
use crate::rotation::Rotator;
use crate::tracker::LinearAxis;

/// The rig: linear axis, rotation mount, and the pending capture plan.
pub struct Cart<R: RailIo, T: RotaryIo> {
    pub(crate) linear: LinearAxis<R>,
    pub(crate) rotator: Rotator<T>,
    geometry: BeltGeometry,
    view: ViewConfig,
    instructions: Vec<Waypoint>,
    load_on_start: bool,
}

/// Snapshot of the rig for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CartStatus {
    pub homed: bool,
    pub max_steps: Option<u32>,
    pub direction_increase: Option<bool>,
    pub cur_location: Option<u32>,
    pub rotation_degrees: f64,
    pub positions: std::collections::BTreeMap<u32, u32>,
    pub pending_instructions: usize,
}

impl<R: RailIo, T: RotaryIo> Cart<R, T> {
    /// Build a cart over the given I/O backends. Validates the whole
    /// configuration up front; no hardware is touched until
    /// [`Cart::initialize`].
    pub fn new(rail: R, rotary: T, config: &RigConfig) -> RigResult<Self> {
        config.validate()?;
        let store = CalibrationStore::new(config.calibration.path.clone());
        Ok(Self {
            linear: LinearAxis::new(rail, config.rail.clone(), store),
            rotator: Rotator::new(rotary, config.rotation.clone()),
            geometry: config.rail.geometry.clone(),
            view: config.view.clone(),
            instructions: Vec::new(),
            load_on_start: config.calibration.load_on_start,
        })
    }

    /// Bring the rig to a known state: adopt the stored calibration when
    /// allowed, home otherwise, then build the capture plan.
    ///
    /// `force_home` ignores any stored record. A record that exists but
    /// does not parse is an error rather than a silent re-home; stale
    /// calibration on a moved rig is exactly when positions become unsafe.
    pub fn initialize(&mut self, force_home: bool) -> RigResult<()> {
        let adopted = if force_home || !self.load_on_start {
            None
        } else {
            self.linear.store().load()?
        };

        match adopted {
            Some(record) => {
                info!("Adopting stored calibration");
                self.linear.adopt_record(record);
            }
            None => {
                self.home()?;
            }
        }

        self.plan()
    }

    /// Run the homing sequence and rebuild the capture plan.
    pub fn home(&mut self) -> RigResult<HomingOutcome> {
        let outcome = self.linear.home()?;
        self.instructions.clear();
        Ok(outcome)
    }

    /// Rebuild the capture plan from the current marker map.
    pub fn plan(&mut self) -> RigResult<()> {
        self.instructions =
            create_instructions(self.linear.positions(), &self.geometry, &self.view)?;
        debug!("Planned {} capture waypoints", self.instructions.len());
        Ok(())
    }

    /// Insert a single waypoint, keeping the plan location-ordered.
    pub fn create_instruction(&mut self, waypoint: Waypoint) {
        let at = self
            .instructions
            .partition_point(|w| w.location <= waypoint.location);
        self.instructions.insert(at, waypoint);
    }

    /// The pending capture plan, in execution order.
    pub fn instructions(&self) -> &[Waypoint] {
        &self.instructions
    }

    /// Drive the rail to a calibrated marker.
    pub fn move_to_index(&mut self, index: u32) -> RigResult<u32> {
        self.linear.move_to_index(index)
    }

    /// The linear axis.
    pub fn linear(&self) -> &LinearAxis<R> {
        &self.linear
    }

    /// Mutable access to the linear axis, for direct moves.
    pub fn linear_mut(&mut self) -> &mut LinearAxis<R> {
        &mut self.linear
    }

    /// The rotation mount.
    pub fn rotator(&self) -> &Rotator<T> {
        &self.rotator
    }

    /// Mutable access to the rotation mount.
    pub fn rotator_mut(&mut self) -> &mut Rotator<T> {
        &mut self.rotator
    }

    /// Snapshot the rig state.
    pub fn status(&self) -> CartStatus {
        CartStatus {
            homed: self.linear.is_homed(),
            max_steps: self.linear.max_steps(),
            direction_increase: self.linear.direction_increase(),
            cur_location: self.linear.cur_location(),
            rotation_degrees: self.rotator.heading_degrees(),
            positions: self.linear.positions().clone(),
            pending_instructions: self.instructions.len(),
        }
    }
}
