//! Error taxonomy for the motion engine.
//!
//! Every failure aborts the current operation and any enclosing sequence;
//! nothing is retried inside the engine. Variants carry enough context
//! (current location, attempted target, envelope bounds) for the caller to
//! render a precise diagnostic without re-querying the rig.

use std::path::PathBuf;

use hardware::HardwareError;
use thiserror::Error;

/// Errors raised by calibration, motion, and planning operations.
#[derive(Error, Debug)]
pub enum RigError {
    /// Both homing sweeps terminated on the same boundary switch, so the two
    /// physical limits appear to be wired to one sensor and no meaningful
    /// envelope can be established.
    #[error(
        "boundary switches appear to share one sensor: home boundary re-fired \
         {traveled} steps into the outward sweep"
    )]
    SharedBoundarySensor {
        /// Steps traveled on the outward sweep before the re-fire.
        traveled: u32,
    },

    /// A homing sweep ran past the configured safety ceiling without either
    /// boundary firing. The motor driver is left disabled.
    #[error("no boundary found within the travel ceiling of {ceiling} steps; motor disabled")]
    TravelLimitExceeded {
        /// The safety ceiling that was exhausted.
        ceiling: u32,
    },

    /// A requested move would land outside the travel envelope. No motion
    /// was performed.
    #[error("target {target} is outside [0, {max_steps}] (currently at {current})")]
    OutOfBounds {
        /// Location before the rejected move.
        current: u32,
        /// Attempted target, which may be negative.
        target: i64,
        /// Upper bound of the envelope.
        max_steps: u32,
    },

    /// A directional move was requested before homing established the
    /// envelope and direction convention (and no calibration record was
    /// loaded).
    #[error("axis has not been homed and no calibration record is loaded")]
    NotHomed,

    /// The requested position index is absent from the index mapping.
    #[error("position index {index} not found ({count} positions known)")]
    IndexNotFound {
        /// The index that was requested.
        index: u32,
        /// Number of indices currently mapped.
        count: usize,
    },

    /// A boundary switch fired mid-move outside of homing. The partial
    /// location reached has been committed.
    #[error("boundary triggered at location {location} while moving to {target}")]
    UnexpectedObstruction {
        /// Actual location where the move stopped.
        location: u32,
        /// Target the move was heading for.
        target: u32,
    },

    /// A calibration file exists but is missing a mandatory field or holds
    /// values inconsistent with its own envelope.
    #[error("calibration record at {path} is unusable: {reason}")]
    CorruptCalibration {
        /// File the record was read from.
        path: PathBuf,
        /// What made the record unusable.
        reason: String,
    },

    /// Filesystem failure reading or writing the calibration store.
    #[error("calibration store IO: {0}")]
    CalibrationIo(#[from] std::io::Error),

    /// Failure reported by the hardware backend.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// Configuration rejected before any hardware interaction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Homing completed but the marker sweep produced no positions, so
    /// there is nothing to plan against.
    #[error("no marker positions found; cannot plan instructions")]
    NoPositions,

    /// `follow_all` was invoked with an empty instruction list.
    #[error("no instructions pending")]
    NoInstructions,

    /// The externally supplied capture action failed at a waypoint.
    #[error("capture failed at waypoint {index}/{label}")]
    Capture {
        /// Index of the waypoint whose capture failed.
        index: u32,
        /// Label of the waypoint whose capture failed.
        label: String,
        /// The capture action's own error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result alias for engine operations.
pub type RigResult<T> = Result<T, RigError>;
