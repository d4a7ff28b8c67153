//! Calibration record persistence.
//!
//! The record is a snapshot of everything homing established plus the last
//! committed location. It is rewritten after every committed move so a crash
//! or power loss can be recovered by reloading the file instead of re-homing
//! blindly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RigError, RigResult};

/// Persisted calibration snapshot.
///
/// All four fields are mandatory together; a record missing any of them is
/// rejected as corrupt rather than partially adopted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Marker index → absolute location mapping from the last homing pass.
    pub positions: BTreeMap<u32, u32>,
    /// Last committed absolute location.
    pub cur_location: u32,
    /// Physical step direction that increases location.
    pub direction_sign: bool,
    /// Length of the travel envelope in steps.
    pub max_steps: u32,
}

impl CalibrationRecord {
    /// Check internal consistency beyond field presence.
    fn check(&self, path: &Path) -> RigResult<()> {
        let corrupt = |reason: String| RigError::CorruptCalibration {
            path: path.to_path_buf(),
            reason,
        };

        if self.max_steps == 0 {
            return Err(corrupt("max_steps is zero".into()));
        }
        if self.cur_location > self.max_steps {
            return Err(corrupt(format!(
                "cur_location {} exceeds max_steps {}",
                self.cur_location, self.max_steps
            )));
        }
        if let Some((index, &location)) = self
            .positions
            .iter()
            .find(|&(_, &location)| location > self.max_steps)
        {
            return Err(corrupt(format!(
                "position {index} at {location} exceeds max_steps {}",
                self.max_steps
            )));
        }
        Ok(())
    }
}

/// File-backed store for the calibration record.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    /// Create a store writing to the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, or `None` if no file exists yet.
    ///
    /// A file that exists but is missing any mandatory field, or whose
    /// values contradict its own envelope, fails with
    /// [`RigError::CorruptCalibration`].
    pub fn load(&self) -> RigResult<Option<CalibrationRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let record: CalibrationRecord =
            serde_json::from_str(&contents).map_err(|e| RigError::CorruptCalibration {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        record.check(&self.path)?;

        debug!(
            "Loaded calibration from {}: {} positions, envelope {} steps",
            self.path.display(),
            record.positions.len(),
            record.max_steps
        );
        Ok(Some(record))
    }

    /// Remove the record file, if any.
    ///
    /// Used before motion that invalidates the record, so a crash mid-way
    /// leaves nothing stale to adopt on the next startup.
    pub fn clear(&self) -> RigResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Cleared calibration at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the record atomically.
    ///
    /// Writes to a sibling temporary file and renames it over the target, so
    /// a crash mid-write never leaves a half-written record for a later
    /// `load` to trip over.
    pub fn save(&self, record: &CalibrationRecord) -> RigResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(record).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!(
            "Saved calibration to {} (cur_location {})",
            self.path.display(),
            record.cur_location
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record() -> CalibrationRecord {
        CalibrationRecord {
            positions: [(0, 110), (1, 320)].into_iter().collect(),
            cur_location: 40,
            direction_sign: false,
            max_steps: 430,
        }
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("calibration.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn round_trips() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("calibration.json"));
        let record = sample_record();
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), Some(record));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("nested/deeper/calibration.json"));
        store.save(&sample_record()).unwrap();
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn missing_field_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        // direction_sign omitted
        std::fs::write(
            &path,
            r#"{ "positions": {"0": 10}, "cur_location": 5, "max_steps": 100 }"#,
        )
        .unwrap();

        let store = CalibrationStore::new(path);
        assert!(matches!(
            store.load(),
            Err(RigError::CorruptCalibration { .. })
        ));
    }

    #[test]
    fn location_beyond_envelope_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("calibration.json"));
        let mut record = sample_record();
        record.cur_location = 431;
        store.save(&record).unwrap();
        assert!(matches!(
            store.load(),
            Err(RigError::CorruptCalibration { .. })
        ));
    }

    #[test]
    fn overwrite_replaces_previous_record() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("calibration.json"));
        let mut record = sample_record();
        store.save(&record).unwrap();
        record.cur_location = 250;
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap().unwrap().cur_location, 250);
    }
}
