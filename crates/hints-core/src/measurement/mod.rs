//! Session log: measurement records, markers and their text rendering.

mod log;
mod record;
mod sink;

pub use log::{LogEntry, SessionLog};
pub use record::{
    GazeReading, MeasurementRecord, HEADER, LABEL_FORMAT, NOT_AVAILABLE, SAMPLE_ORDER,
    TIMESTAMP_FORMAT,
};
pub use sink::MeasurementSink;
