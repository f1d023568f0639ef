use clap::Subcommand;
use hints_core::{CalibrationStore, FileCalibrationStore};

#[derive(Subcommand)]
pub enum CalibrationAction {
    /// Show whether calibration has been performed
    Status,
    /// Toggle the calibration flag, as the headset calibration button does
    Launch,
    /// Clear the calibration flag
    Clear,
}

pub fn run(action: CalibrationAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = FileCalibrationStore::open_default()?;
    let calibrated = match action {
        CalibrationAction::Status => store.load()?,
        CalibrationAction::Launch => {
            let toggled = !store.load()?;
            store.save(toggled)?;
            toggled
        }
        CalibrationAction::Clear => {
            store.save(false)?;
            false
        }
    };
    let json = serde_json::json!({
        "calibrated": calibrated,
        "path": store.path().display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
