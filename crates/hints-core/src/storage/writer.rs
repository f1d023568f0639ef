//! Persisting a finished session log.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Local};

use crate::error::StorageError;
use crate::measurement::LABEL_FORMAT;

/// Everything a writer needs to store one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    /// `yyyy_MM_dd_HH_mm_ss` of the session start.
    pub session_label: String,
    pub saved_at: DateTime<Local>,
    /// Full log text, header included.
    pub text: String,
}

pub trait StorageWriter {
    /// Stores the log and returns where it went.
    ///
    /// # Errors
    ///
    /// Returns an error if the log could not be stored. The caller does not retry.
    fn persist(&mut self, request: &PersistRequest) -> Result<String, StorageError>;
}

/// Writes `<root>/HINTS/Patient_startAppAt_<label>/<save stamp><suffix>.txt`.
#[derive(Debug, Clone)]
pub struct FileStorageWriter {
    root: PathBuf,
    suffix: String,
}

impl FileStorageWriter {
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
        }
    }

    pub fn session_dir(&self, session_label: &str) -> PathBuf {
        self.root
            .join("HINTS")
            .join(format!("Patient_startAppAt_{session_label}"))
    }

    pub fn target(&self, request: &PersistRequest) -> PathBuf {
        self.session_dir(&request.session_label).join(format!(
            "{}{}.txt",
            request.saved_at.format(LABEL_FORMAT),
            self.suffix
        ))
    }
}

impl StorageWriter for FileStorageWriter {
    fn persist(&mut self, request: &PersistRequest) -> Result<String, StorageError> {
        let dir = self.session_dir(&request.session_label);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        let path = self.target(request);
        std::fs::write(&path, &request.text).map_err(|e| StorageError::io(&path, e))?;
        Ok(path.display().to_string())
    }
}

/// Keeps requests in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageWriter {
    saved: Rc<RefCell<Vec<PersistRequest>>>,
    fail_with: Option<String>,
}

impl MemoryStorageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer that rejects every request with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            saved: Rc::default(),
            fail_with: Some(message.into()),
        }
    }

    pub fn saved(&self) -> Vec<PersistRequest> {
        self.saved.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.saved.borrow().len()
    }
}

impl StorageWriter for MemoryStorageWriter {
    fn persist(&mut self, request: &PersistRequest) -> Result<String, StorageError> {
        if let Some(message) = &self.fail_with {
            return Err(StorageError::Rejected(message.clone()));
        }
        self.saved.borrow_mut().push(request.clone());
        Ok(format!("memory:{}", request.session_label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> PersistRequest {
        PersistRequest {
            session_label: "2024_03_05_14_00_00".into(),
            saved_at: Local.with_ymd_and_hms(2024, 3, 5, 14, 9, 30).unwrap(),
            text: "timestamp, \n".into(),
        }
    }

    #[test]
    fn file_writer_uses_session_folder_and_save_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FileStorageWriter::new(dir.path(), "_longmessage");

        let location = writer.persist(&request()).unwrap();

        let expected = dir
            .path()
            .join("HINTS")
            .join("Patient_startAppAt_2024_03_05_14_00_00")
            .join("2024_03_05_14_09_30_longmessage.txt");
        assert_eq!(location, expected.display().to_string());
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "timestamp, \n");
    }

    #[test]
    fn file_writer_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("HINTS");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut writer = FileStorageWriter::new(dir.path(), "_longmessage");
        assert!(matches!(writer.persist(&request()), Err(StorageError::Io { .. })));
    }

    #[test]
    fn memory_writer_records_and_fails_on_demand() {
        let mut ok = MemoryStorageWriter::new();
        let handle = ok.clone();
        ok.persist(&request()).unwrap();
        assert_eq!(handle.count(), 1);
        assert_eq!(handle.saved()[0], request());

        let mut bad = MemoryStorageWriter::failing("disk full");
        let err = bad.persist(&request()).unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}
