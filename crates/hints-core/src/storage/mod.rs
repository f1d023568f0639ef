mod calibration;
mod config;
mod writer;

pub use calibration::{CalibrationStore, FileCalibrationStore, MemoryCalibrationStore};
pub use config::{AudioConfig, Config, ReadinessConfig, StorageConfig, TimingConfig};
pub use writer::{FileStorageWriter, MemoryStorageWriter, PersistRequest, StorageWriter};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/hints-exam[-dev]/` based on HINTS_ENV.
///
/// Set HINTS_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HINTS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("hints-exam-dev")
    } else {
        base_dir.join("hints-exam")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
