//! Capture plan execution.

use tracing::{info, warn};

use hardware::{RailIo, RotaryIo};

use crate::cart::Cart;
use crate::error::{RigError, RigResult};
use crate::planner::Waypoint;

/// Action performed once the rig is posed at a waypoint.
///
/// Implemented for any `FnMut(&Waypoint) -> Result<A, _>` closure, so a
/// camera trigger, a measurement read, or a plain logger all plug in the
/// same way.
pub trait CaptureAction {
    type Artifact;

    fn capture(
        &mut self,
        waypoint: &Waypoint,
    ) -> Result<Self::Artifact, Box<dyn std::error::Error + Send + Sync>>;
}

impl<A, F> CaptureAction for F
where
    F: FnMut(&Waypoint) -> Result<A, Box<dyn std::error::Error + Send + Sync>>,
{
    type Artifact = A;

    fn capture(
        &mut self,
        waypoint: &Waypoint,
    ) -> Result<A, Box<dyn std::error::Error + Send + Sync>> {
        self(waypoint)
    }
}

/// Pose-only capture action: visits the waypoint without capturing anything.
pub fn no_capture(
    _waypoint: &Waypoint,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    Ok(())
}

impl<R: RailIo, T: RotaryIo> Cart<R, T> {
    /// Pose the rig at one waypoint and run the capture action.
    ///
    /// The rail moves first, then the mount rotates, then the action runs.
    /// The mount is returned to heading zero before this returns, even when
    /// the capture fails; the rail keeps whatever location it reached.
    pub fn follow<C: CaptureAction>(
        &mut self,
        waypoint: &Waypoint,
        action: &mut C,
    ) -> RigResult<C::Artifact> {
        info!(
            "Waypoint {}: location {:.2}, rotation {:.2} deg",
            waypoint.label, waypoint.location, waypoint.rotation
        );
        self.linear.move_to_absolute(waypoint.location.round() as i64)?;
        self.rotator.move_to(waypoint.rotation)?;

        let captured = action.capture(waypoint).map_err(|source| RigError::Capture {
            index: waypoint.index,
            label: waypoint.label.clone(),
            source,
        });

        self.rotator.move_to(0.0)?;
        captured
    }

    /// Execute the whole pending plan in order, stopping at the first
    /// failure. Waypoints completed before the failure stay completed; the
    /// plan itself is not consumed and can be re-run.
    pub fn follow_all<C: CaptureAction>(
        &mut self,
        action: &mut C,
    ) -> RigResult<Vec<C::Artifact>> {
        if self.instructions().is_empty() {
            return Err(RigError::NoInstructions);
        }

        let plan = self.instructions().to_vec();
        let mut artifacts = Vec::with_capacity(plan.len());
        for waypoint in &plan {
            artifacts.push(self.follow(waypoint, action)?);
        }

        if let Err(e) = self.rotator.release() {
            warn!("Plan complete but coil release failed: {e}");
        }
        info!("Executed {} waypoints", artifacts.len());
        Ok(artifacts)
    }
}
