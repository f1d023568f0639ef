use chrono::{DateTime, Local};

use super::log::SessionLog;
use super::record::{GazeReading, MeasurementRecord, SAMPLE_ORDER};
use crate::sensors::{GazeProvider, HeadPoseProvider};

/// Turns one provider snapshot into one log record.
///
/// Appending is the only side effect; phase state is never touched here.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSink {
    records_written: u64,
}

impl MeasurementSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written since construction. Not cleared by a session reset.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Queries all six gaze readings and the head pose, then appends a record.
    pub fn record(
        &mut self,
        log: &mut SessionLog,
        gaze: &mut dyn GazeProvider,
        head: &mut dyn HeadPoseProvider,
        at: DateTime<Local>,
    ) {
        let readings: [GazeReading; 6] =
            SAMPLE_ORDER.map(|(space, eye)| gaze.sample(eye, space, at).into());
        let pose = head.current_pose();
        log.push_record(MeasurementRecord {
            timestamp: at,
            gaze: readings,
            head: pose,
        });
        self.records_written += 1;
    }
}
