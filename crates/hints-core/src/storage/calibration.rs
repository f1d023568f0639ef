//! Persistence of the "calibration performed" flag.
//!
//! The on-disk shape `{"data":{"calibration":<bool>}}` is shared with the
//! headset tooling, so it is kept as is.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::StorageError;

/// Where the calibration flag lives.
pub trait CalibrationStore {
    /// # Errors
    ///
    /// Returns an error if the backing document cannot be read or decoded.
    fn load(&mut self) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns an error if the backing document cannot be written.
    fn save(&mut self, calibrated: bool) -> Result<(), StorageError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CalibrationDocument {
    data: CalibrationData,
}

#[derive(Debug, Serialize, Deserialize)]
struct CalibrationData {
    calibration: bool,
}

/// `Config.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileCalibrationStore {
    path: PathBuf,
}

impl FileCalibrationStore {
    pub const FILE_NAME: &'static str = "Config.json";

    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
        }
    }

    /// Store in the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::new(data_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for FileCalibrationStore {
    /// Missing or empty files are (re)created holding `false`.
    fn load(&mut self) -> Result<bool, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if content.trim().is_empty() {
            self.save(false)?;
            return Ok(false);
        }
        let doc: CalibrationDocument =
            serde_json::from_str(&content).map_err(|source| StorageError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(doc.data.calibration)
    }

    fn save(&mut self, calibrated: bool) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let doc = CalibrationDocument {
            data: CalibrationData {
                calibration: calibrated,
            },
        };
        let json = serde_json::to_string(&doc).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|e| StorageError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), calibrated, "calibration flag saved");
        Ok(())
    }
}

/// In-memory store. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalibrationStore {
    flag: Rc<Cell<bool>>,
    saves: Rc<Cell<usize>>,
}

impl MemoryCalibrationStore {
    pub fn new(calibrated: bool) -> Self {
        Self {
            flag: Rc::new(Cell::new(calibrated)),
            saves: Rc::default(),
        }
    }

    pub fn get(&self) -> bool {
        self.flag.get()
    }

    /// Number of `save` calls so far.
    pub fn saves(&self) -> usize {
        self.saves.get()
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&mut self) -> Result<bool, StorageError> {
        Ok(self.flag.get())
    }

    fn save(&mut self, calibrated: bool) -> Result<(), StorageError> {
        self.flag.set(calibrated);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_uncalibrated() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCalibrationStore::new(dir.path());
        assert!(!store.load().unwrap());
        let written = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(written, r#"{"data":{"calibration":false}}"#);
    }

    #[test]
    fn empty_file_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCalibrationStore::new(dir.path());
        std::fs::write(store.path(), "").unwrap();
        assert!(!store.load().unwrap());
        assert!(!std::fs::read_to_string(store.path()).unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCalibrationStore::new(dir.path());
        store.save(true).unwrap();
        assert!(store.load().unwrap());
        assert!(FileCalibrationStore::new(dir.path()).load().unwrap());
    }

    #[test]
    fn reads_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCalibrationStore::new(dir.path());
        std::fs::write(store.path(), r#"{ "data": { "calibration": true } }"#).unwrap();
        assert!(store.load().unwrap());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileCalibrationStore::new(dir.path());
        std::fs::write(store.path(), "{\"calibration\": true}").unwrap();
        assert!(matches!(store.load(), Err(StorageError::Malformed { .. })));
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryCalibrationStore::new(false);
        let mut handle = store.clone();
        handle.save(true).unwrap();
        assert!(store.get());
        assert_eq!(store.saves(), 1);
    }
}
