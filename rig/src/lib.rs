//! Motion calibration and capture planning for a two-axis camera rig.
//!
//! The rig is a cart on a belt-driven linear rail with a geared rotation
//! mount on top. Neither axis has an absolute encoder; position comes from
//! homing against the rail's boundary switches and dead-reckoning every
//! step after that. This crate owns that bookkeeping:
//!
//! - [`Cart`] orchestrates both axes and the capture plan
//! - [`tracker::LinearAxis`] homes the rail and tracks absolute location
//! - [`rotation::Rotator`] drives the mount in quantized half-steps
//! - [`planner::create_instructions`] turns calibrated markers into
//!   location-ordered capture waypoints
//! - [`calibration::CalibrationStore`] persists the envelope and marker map
//!   across restarts
//!
//! All hardware access goes through the [`hardware`] crate's [`RailIo`] and
//! [`RotaryIo`] traits, so the whole stack runs unchanged against the
//! simulator. Everything is synchronous and single-threaded; motion is
//! serialized because every operation takes `&mut Cart`.

pub mod calibration;
pub mod cart;
pub mod cluster;
pub mod config;
pub mod error;
pub mod executor;
pub mod homing;
pub mod planner;
pub mod rotation;
pub mod tracker;

pub use cart::{Cart, CartStatus};
pub use config::RigConfig;
pub use error::{RigError, RigResult};
pub use executor::{no_capture, CaptureAction};
pub use hardware::{RailIo, RotaryIo};
pub use planner::Waypoint;
