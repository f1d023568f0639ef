//! Pre-session workflow around the sequencer: calibration, start, reset.
//!
//! A session may only start once the calibration flag is set. Starting
//! consumes the persisted flag, so the next patient has to calibrate again.

use tracing::{debug, info, warn};

use crate::audio::Cue;
use crate::error::StorageError;
use crate::events::Event;
use crate::measurement::TIMESTAMP_FORMAT;
use crate::sequencer::PhaseSequencer;
use crate::storage::CalibrationStore;

pub struct Examination {
    sequencer: PhaseSequencer,
    calibration: Box<dyn CalibrationStore>,
    calibrated: bool,
    started: bool,
}

impl Examination {
    /// Wraps `sequencer` and reads the calibration flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the calibration store cannot be read.
    pub fn new(
        sequencer: PhaseSequencer,
        calibration: impl CalibrationStore + 'static,
    ) -> Result<Self, StorageError> {
        let mut calibration: Box<dyn CalibrationStore> = Box::new(calibration);
        let calibrated = calibration.load()?;
        info!(calibrated, "examination ready");
        Ok(Self {
            sequencer,
            calibration,
            calibrated,
            started: false,
        })
    }

    pub fn sequencer(&self) -> &PhaseSequencer {
        &self.sequencer
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Toggles the calibration flag and persists it. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag cannot be written.
    pub fn launch_calibration(&mut self) -> Result<bool, StorageError> {
        self.calibrated = !self.calibrated;
        self.calibration.save(self.calibrated)?;
        info!(calibrated = self.calibrated, "calibration toggled");
        Ok(self.calibrated)
    }

    /// Starts the session if calibrated and not yet started.
    ///
    /// Returns the start event, or `None` when nothing happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the consumed calibration flag cannot be written;
    /// the session is not started in that case.
    pub fn start(&mut self) -> Result<Option<Event>, StorageError> {
        if self.started {
            debug!("examination already started");
            return Ok(None);
        }
        if !self.calibrated {
            warn!("start requested before calibration");
            return Ok(None);
        }
        self.calibration.save(false)?;
        self.started = true;

        let at = self.sequencer.now();
        let label = self.sequencer.session().label();
        self.sequencer.append_marker(format!(
            "Start recording name: {}, callibration is performed, started application at {label}",
            at.format(TIMESTAMP_FORMAT)
        ));
        self.sequencer.announce(Cue::SayName);

        let session_id = self.sequencer.session().id();
        info!(%session_id, %label, "examination started");
        Ok(Some(Event::ExaminationStarted { session_id, at }))
    }

    /// Forwards to the sequencer once started.
    pub fn tick(&mut self, delta_secs: f64) -> Vec<Event> {
        if !self.started {
            return Vec::new();
        }
        self.sequencer.tick(delta_secs)
    }

    /// Resets the sequencer and requires a new calibration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleared flag cannot be written. The in-memory
    /// reset has already happened by then.
    pub fn reset(&mut self) -> Result<Event, StorageError> {
        let event = self.sequencer.reset();
        self.calibrated = false;
        self.started = false;
        self.calibration.save(false)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{PhaseDurations, PhaseId};
    use crate::sequencer::{Collaborators, SequencerSettings};
    use crate::sim::{ScriptedGaze, SimulatedAudio, SimulatedHead};
    use crate::storage::{MemoryCalibrationStore, MemoryStorageWriter};

    fn examination(store: MemoryCalibrationStore, audio: SimulatedAudio) -> Examination {
        let devices = Collaborators::new(
            ScriptedGaze::always(true),
            SimulatedHead::default(),
            audio,
            MemoryStorageWriter::new(),
        );
        let settings = SequencerSettings {
            phases: PhaseDurations::uniform(0.0),
            ..SequencerSettings::default()
        };
        Examination::new(PhaseSequencer::new(settings, devices).unwrap(), store).unwrap()
    }

    #[test]
    fn start_requires_calibration() {
        let store = MemoryCalibrationStore::new(false);
        let mut exam = examination(store, SimulatedAudio::uniform(0.0));
        assert!(exam.start().unwrap().is_none());
        assert!(!exam.is_started());
        assert!(exam.tick(1.0).is_empty());
        assert_eq!(exam.sequencer().clock(), 0.0);
    }

    #[test]
    fn start_consumes_flag_and_writes_name_marker() {
        let store = MemoryCalibrationStore::new(true);
        let audio = SimulatedAudio::uniform(0.0);
        let mut exam = examination(store.clone(), audio.clone());

        let event = exam.start().unwrap();
        assert!(matches!(event, Some(Event::ExaminationStarted { .. })));
        assert!(!store.get());
        assert_eq!(audio.played(), vec![Cue::SayName]);

        let markers: Vec<_> = exam.sequencer().session().log().markers().collect();
        assert_eq!(markers.len(), 1);
        assert!(markers[0].starts_with("Start recording name: "));
        assert!(markers[0].contains(", callibration is performed, started application at "));

        // Second start is a no-op.
        assert!(exam.start().unwrap().is_none());
        assert_eq!(audio.played().len(), 1);
    }

    #[test]
    fn launch_calibration_toggles_and_persists() {
        let store = MemoryCalibrationStore::new(false);
        let mut exam = examination(store.clone(), SimulatedAudio::uniform(0.0));
        assert!(exam.launch_calibration().unwrap());
        assert!(store.get());
        assert!(!exam.launch_calibration().unwrap());
        assert!(!store.get());
    }

    #[test]
    fn reset_clears_calibration_and_session() {
        let store = MemoryCalibrationStore::new(true);
        let mut exam = examination(store.clone(), SimulatedAudio::uniform(0.0));
        exam.start().unwrap();
        for _ in 0..10 {
            exam.tick(0.1);
        }
        assert_ne!(exam.sequencer().current_phase(), PhaseId::ReadinessGate);

        let event = exam.reset().unwrap();
        assert!(matches!(event, Event::SessionReset { epoch: 1, .. }));
        assert!(!exam.is_calibrated());
        assert!(!exam.is_started());
        assert!(!store.get());
        assert_eq!(exam.sequencer().current_phase(), PhaseId::ReadinessGate);
        assert!(exam.sequencer().session().log().is_empty());
    }
}
