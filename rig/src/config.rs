//! Typed rig configuration.
//!
//! The whole configuration is parsed and validated once at startup, before
//! any hardware interaction. Defaults match the rig as built: a 60-tooth
//! GT3 pulley on a 400 step/rev motor over a 60 m belt, and a 4096 half-step
//! rotation mount.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// Linear rail settings.
    #[serde(default)]
    pub rail: RailConfig,

    /// Rotation mount settings.
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Viewing geometry for instruction planning.
    #[serde(default)]
    pub view: ViewConfig,

    /// Calibration persistence settings.
    pub calibration: CalibrationConfig,

    /// GPIO wiring, required only when driving real hardware.
    #[serde(default)]
    pub gpio: Option<GpioConfig>,
}

/// Linear rail homing and motion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailConfig {
    /// Steps reversed after a limit switch fires, to clear the switch.
    #[serde(default = "default_backoff_steps")]
    pub backoff_steps: u32,

    /// Sensors are sampled every this many pulses during motion.
    #[serde(default = "default_sample_interval")]
    pub sample_interval: u32,

    /// Maximum gap (in steps) between marker pulses that still belong to
    /// the same physical marker.
    #[serde(default = "default_marker_tolerance")]
    pub marker_tolerance: u32,

    /// Safety ceiling for homing sweeps, in steps. Defaults to the
    /// belt-length-derived maximum.
    #[serde(default)]
    pub travel_ceiling: Option<u32>,

    /// Physical drive geometry, used to bound the travel ceiling.
    #[serde(default)]
    pub geometry: BeltGeometry,
}

impl Default for RailConfig {
    fn default() -> Self {
        Self {
            backoff_steps: default_backoff_steps(),
            sample_interval: default_sample_interval(),
            marker_tolerance: default_marker_tolerance(),
            travel_ceiling: None,
            geometry: BeltGeometry::default(),
        }
    }
}

impl RailConfig {
    /// Effective homing safety ceiling in steps.
    pub fn ceiling(&self) -> u32 {
        self.travel_ceiling
            .unwrap_or_else(|| self.geometry.steps_per_belt())
    }
}

/// Timing-belt drive geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeltGeometry {
    /// Teeth on the drive pulley.
    #[serde(default = "default_pulley_teeth")]
    pub pulley_teeth: u32,

    /// Belt tooth pitch in millimeters.
    #[serde(default = "default_timing_pitch_mm")]
    pub timing_pitch_mm: f64,

    /// Motor steps per revolution.
    #[serde(default = "default_steps_per_rev")]
    pub steps_per_rev: u32,

    /// Total belt length in millimeters.
    #[serde(default = "default_belt_length_mm")]
    pub belt_length_mm: f64,
}

impl Default for BeltGeometry {
    fn default() -> Self {
        Self {
            pulley_teeth: default_pulley_teeth(),
            timing_pitch_mm: default_timing_pitch_mm(),
            steps_per_rev: default_steps_per_rev(),
            belt_length_mm: default_belt_length_mm(),
        }
    }
}

impl BeltGeometry {
    /// Linear travel per motor step in millimeters.
    pub fn mm_per_step(&self) -> f64 {
        let len_per_rev = self.pulley_teeth as f64 * self.timing_pitch_mm;
        len_per_rev / self.steps_per_rev as f64
    }

    /// Steps to traverse the full belt; the hard upper bound on any travel.
    pub fn steps_per_belt(&self) -> u32 {
        (self.belt_length_mm / self.mm_per_step()).floor() as u32
    }
}

/// Rotation mount settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Degrees per half-step of the rotation motor.
    #[serde(default = "default_deg_per_step")]
    pub deg_per_step: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            deg_per_step: default_deg_per_step(),
        }
    }
}

impl RotationConfig {
    /// Half-steps per full revolution.
    pub fn steps_per_rev(&self) -> u32 {
        (360.0 / self.deg_per_step).round() as u32
    }
}

/// Viewing geometry for instruction planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Distance from the rail to the object, in millimeters.
    #[serde(default = "default_object_distance_mm")]
    pub object_distance_mm: f64,

    /// Total viewing cone angle in degrees; each marker is captured at
    /// `-angle/2`, `0`, and `+angle/2`.
    #[serde(default = "default_angle_degrees")]
    pub angle_degrees: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            object_distance_mm: default_object_distance_mm(),
            angle_degrees: default_angle_degrees(),
        }
    }
}

/// Calibration persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Path of the calibration record file.
    pub path: PathBuf,

    /// Adopt an existing record at startup instead of re-homing.
    #[serde(default = "default_true")]
    pub load_on_start: bool,
}

/// GPIO wiring for real hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    /// GPIO chip device name, e.g. `gpiochip0`.
    #[serde(default = "default_chip")]
    pub chip: String,

    /// Rail stepper STEP line.
    pub step_line: u32,
    /// Rail stepper DIR line.
    pub dir_line: u32,
    /// Rail stepper ENABLE line.
    pub enable_line: u32,
    /// Boundary switch A input line.
    pub boundary_a_line: u32,
    /// Boundary switch B input line.
    pub boundary_b_line: u32,
    /// Marker sensor input line.
    pub marker_line: u32,
    /// Rotation motor coil lines, in drive-sequence order.
    pub coil_lines: [u32; 4],
}

fn default_backoff_steps() -> u32 {
    40
}
fn default_sample_interval() -> u32 {
    5
}
fn default_marker_tolerance() -> u32 {
    5
}
fn default_pulley_teeth() -> u32 {
    60
}
fn default_timing_pitch_mm() -> f64 {
    3.0
}
fn default_steps_per_rev() -> u32 {
    400
}
fn default_belt_length_mm() -> f64 {
    60_000.0
}
fn default_deg_per_step() -> f64 {
    5.625 / 64.0
}
fn default_object_distance_mm() -> f64 {
    300.0
}
fn default_angle_degrees() -> f64 {
    10.0
}
fn default_true() -> bool {
    true
}
fn default_chip() -> String {
    "gpiochip0".to_string()
}

impl RigConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn load(path: &Path) -> RigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RigError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: RigConfig = serde_json::from_str(&contents).map_err(|e| {
            RigError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject malformed values before any hardware interaction begins.
    pub fn validate(&self) -> RigResult<()> {
        let rail = &self.rail;
        if rail.sample_interval == 0 {
            return Err(RigError::InvalidConfig(
                "rail.sample_interval must be positive".into(),
            ));
        }
        if rail.backoff_steps == 0 {
            return Err(RigError::InvalidConfig(
                "rail.backoff_steps must be positive".into(),
            ));
        }

        let geom = &rail.geometry;
        if geom.pulley_teeth == 0 || geom.steps_per_rev == 0 {
            return Err(RigError::InvalidConfig(
                "rail.geometry tooth and step counts must be positive".into(),
            ));
        }
        if geom.timing_pitch_mm <= 0.0 || geom.belt_length_mm <= 0.0 {
            return Err(RigError::InvalidConfig(
                "rail.geometry pitch and belt length must be positive".into(),
            ));
        }

        let belt_steps = geom.steps_per_belt();
        if let Some(ceiling) = rail.travel_ceiling {
            if ceiling == 0 {
                return Err(RigError::InvalidConfig(
                    "rail.travel_ceiling must be positive".into(),
                ));
            }
            if ceiling > belt_steps {
                return Err(RigError::InvalidConfig(format!(
                    "rail.travel_ceiling ({ceiling}) exceeds the belt length ({belt_steps} steps)"
                )));
            }
        }
        if rail.backoff_steps >= rail.ceiling() {
            return Err(RigError::InvalidConfig(
                "rail.backoff_steps must be smaller than the travel ceiling".into(),
            ));
        }

        if self.rotation.deg_per_step <= 0.0 || self.rotation.deg_per_step > 360.0 {
            return Err(RigError::InvalidConfig(
                "rotation.deg_per_step must be in (0, 360]".into(),
            ));
        }

        if self.view.object_distance_mm <= 0.0 {
            return Err(RigError::InvalidConfig(
                "view.object_distance_mm must be positive".into(),
            ));
        }
        if self.view.angle_degrees <= 0.0 || self.view.angle_degrees >= 180.0 {
            return Err(RigError::InvalidConfig(
                "view.angle_degrees must be in (0, 180)".into(),
            ));
        }

        if self.calibration.path.as_os_str().is_empty() {
            return Err(RigError::InvalidConfig(
                "calibration.path must be set".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_defaults() -> RigConfig {
        RigConfig {
            rail: RailConfig::default(),
            rotation: RotationConfig::default(),
            view: ViewConfig::default(),
            calibration: CalibrationConfig {
                path: PathBuf::from("/tmp/rig-calibration.json"),
                load_on_start: true,
            },
            gpio: None,
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(config_with_defaults().validate().is_ok());
    }

    #[test]
    fn belt_geometry_derives_step_ceiling() {
        let geom = BeltGeometry::default();
        // 60 teeth * 3 mm pitch / 400 steps = 0.45 mm per step
        assert!((geom.mm_per_step() - 0.45).abs() < 1e-12);
        // 60000 mm / 0.45 mm per step
        assert_eq!(geom.steps_per_belt(), 133_333);
    }

    #[test]
    fn ceiling_beyond_belt_rejected() {
        let mut config = config_with_defaults();
        config.rail.travel_ceiling = Some(200_000);
        assert!(matches!(
            config.validate(),
            Err(RigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_sample_interval_rejected() {
        let mut config = config_with_defaults();
        config.rail.sample_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_view_angle_rejected() {
        let mut config = config_with_defaults();
        config.view.angle_degrees = 180.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_minimal_json() {
        let json = r#"{ "calibration": { "path": "/tmp/cal.json" } }"#;
        let config: RigConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.rail.backoff_steps, 40);
        assert_eq!(config.rotation.steps_per_rev(), 4096);
        assert!(config.calibration.load_on_start);
        assert!(config.gpio.is_none());
    }
}
