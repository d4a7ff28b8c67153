//! Capture instruction planning.
//!
//! Each calibrated marker yields three waypoints: one looking back at the
//! object from before the marker, one square-on at the marker, and one
//! looking forward from past it. The lateral offsets come from the viewing
//! triangle: at `object_distance` from the rail, a half-angle `a/2` view
//! subtends `object_distance * tan(a/2)` along the track.

use serde::Serialize;
use tracing::debug;

use crate::config::{BeltGeometry, ViewConfig};
use crate::error::{RigError, RigResult};

/// One planned capture position.
#[derive(Debug, Clone, Serialize)]
pub struct Waypoint {
    /// Rail location in steps. Fractional because the viewing offset is a
    /// continuous distance; motion rounds to whole steps when executing.
    pub location: f64,
    /// Mount heading in degrees.
    pub rotation: f64,
    /// Which of the marker's three views this is: `"-"`, `"0"`, or `"+"`.
    pub label: String,
    /// Marker index this waypoint belongs to.
    pub index: u32,
}

/// Expand the calibrated marker map into a location-ordered capture plan.
///
/// `positions` maps marker index to rail location in steps. Waypoints whose
/// offset falls outside `[0, max_steps]` are planned anyway; motion rejects
/// them at execution time.
pub fn create_instructions(
    positions: &std::collections::BTreeMap<u32, u32>,
    geometry: &BeltGeometry,
    view: &ViewConfig,
) -> RigResult<Vec<Waypoint>> {
    if positions.is_empty() {
        return Err(RigError::NoPositions);
    }

    let half_angle = view.angle_degrees / 2.0;
    let offset_mm = view.object_distance_mm * half_angle.to_radians().tan();
    let offset_steps = offset_mm / geometry.mm_per_step();
    debug!(
        "Planning {} markers with {offset_mm:.2} mm ({offset_steps:.2} step) offsets",
        positions.len()
    );

    let mut plan = Vec::with_capacity(positions.len() * 3);
    for (&index, &location) in positions {
        let center = f64::from(location);
        plan.push(Waypoint {
            location: center - offset_steps,
            rotation: half_angle,
            label: "-".to_string(),
            index,
        });
        plan.push(Waypoint {
            location: center,
            rotation: 0.0,
            label: "0".to_string(),
            index,
        });
        plan.push(Waypoint {
            location: center + offset_steps,
            rotation: 360.0 - half_angle,
            label: "+".to_string(),
            index,
        });
    }

    // execution sweeps the rail one way; adjacent markers' waypoints interleave
    plan.sort_by(|x, y| x.location.total_cmp(&y.location));
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn unit_geometry() -> BeltGeometry {
        // 1 mm per step keeps offsets readable
        BeltGeometry {
            pulley_teeth: 1,
            timing_pitch_mm: 400.0,
            steps_per_rev: 400,
            belt_length_mm: 60_000.0,
        }
    }

    #[test]
    fn triplet_per_marker_with_viewing_offsets() {
        let positions = BTreeMap::from([(0, 100)]);
        let view = ViewConfig {
            object_distance_mm: 300.0,
            angle_degrees: 10.0,
        };

        let plan = create_instructions(&positions, &unit_geometry(), &view).unwrap();
        assert_eq!(plan.len(), 3);

        // 300 * tan(5 deg) = 26.2465
        assert_relative_eq!(plan[0].location, 73.7535, epsilon = 1e-3);
        assert_relative_eq!(plan[0].rotation, 5.0);
        assert_eq!(plan[0].label, "-");
        assert_eq!(plan[0].index, 0);

        assert_relative_eq!(plan[1].location, 100.0);
        assert_relative_eq!(plan[1].rotation, 0.0);
        assert_eq!(plan[1].label, "0");
        assert_eq!(plan[1].index, 0);

        assert_relative_eq!(plan[2].location, 126.2465, epsilon = 1e-3);
        assert_relative_eq!(plan[2].rotation, 355.0);
        assert_eq!(plan[2].label, "+");
        assert_eq!(plan[2].index, 0);
    }

    #[test]
    fn plan_is_sorted_by_location() {
        let positions = BTreeMap::from([(0, 500), (1, 120), (2, 530)]);
        let view = ViewConfig::default();

        let plan = create_instructions(&positions, &unit_geometry(), &view).unwrap();
        assert_eq!(plan.len(), 9);
        assert!(plan
            .windows(2)
            .all(|w| w[0].location <= w[1].location));
        // close markers interleave: 500's "+" lands past 530's "-"
        let views: Vec<(u32, &str)> =
            plan.iter().map(|w| (w.index, w.label.as_str())).collect();
        let pos_0 = views.iter().position(|&v| v == (0, "+")).unwrap();
        let pos_2 = views.iter().position(|&v| v == (2, "-")).unwrap();
        assert!(pos_2 < pos_0);
    }

    #[test]
    fn empty_positions_is_an_error() {
        let positions = BTreeMap::new();
        let view = ViewConfig::default();
        assert!(matches!(
            create_instructions(&positions, &unit_geometry(), &view),
            Err(RigError::NoPositions)
        ));
    }

    #[test]
    fn geometry_scales_offsets() {
        let positions = BTreeMap::from([(0, 1000)]);
        let view = ViewConfig {
            object_distance_mm: 300.0,
            angle_degrees: 10.0,
        };
        // default 0.45 mm per step: 26.2465 mm = 58.33 steps
        let plan =
            create_instructions(&positions, &BeltGeometry::default(), &view).unwrap();
        assert_relative_eq!(plan[0].location, 1000.0 - 26.2465 / 0.45, epsilon = 1e-2);
    }
}
