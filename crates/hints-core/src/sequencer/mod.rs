//! Phase sequencer: the examination state machine.
//!
//! The sequencer owns no thread. The driver calls [`PhaseSequencer::tick`]
//! once per frame with the frame's duration; each tick
//!
//! 1. advances the sequencer clock and delivers due timers (cue
//!    completions, the final notification, the save),
//! 2. appends a measurement record unless the readiness gate is active,
//! 3. runs the active phase: issue its cue once, write its marker once,
//!    accumulate elapsed time, and advance when the exit rule holds.
//!
//! ## Phases
//!
//! ```text
//! ReadinessGate -> Intro -> FreeGaze -> HoldStill -> FixateNear -> LookLeft
//!   -> LookRight -> LookUp -> LookDown -> FixateNearHeadMovement -> Finalize
//! ```
//!
//! Waiting for audio is a timer scheduled for the clip length, never a
//! blocked call. Timers carry the epoch they were scheduled in, so after a
//! [`PhaseSequencer::reset`] anything left over from the old session is
//! dropped when it comes due.

mod session;

pub use session::ExaminationSession;

use chrono::{DateTime, Duration, Local};
use tracing::{debug, error, info, warn};

use crate::audio::{AudioPlayer, ClipLengths, Cue};
use crate::error::ConfigError;
use crate::events::Event;
use crate::measurement::{MeasurementSink, TIMESTAMP_FORMAT};
use crate::phase::{check_duration, ExitRule, PhaseDurations, PhaseId, PhaseTable};
use crate::readiness::{ReadinessGate, ReadinessMode};
use crate::sensors::{EyeKind, GazeProvider, HeadPoseProvider, Space};
use crate::storage::{Config, PersistRequest, StorageWriter};
use crate::timer::TimerQueue;

/// The external collaborators a sequencer drives.
pub struct Collaborators {
    pub gaze: Box<dyn GazeProvider>,
    pub head: Box<dyn HeadPoseProvider>,
    pub audio: Box<dyn AudioPlayer>,
    pub storage: Box<dyn StorageWriter>,
}

impl Collaborators {
    pub fn new(
        gaze: impl GazeProvider + 'static,
        head: impl HeadPoseProvider + 'static,
        audio: impl AudioPlayer + 'static,
        storage: impl StorageWriter + 'static,
    ) -> Self {
        Self {
            gaze: Box::new(gaze),
            head: Box::new(head),
            audio: Box::new(audio),
            storage: Box::new(storage),
        }
    }
}

/// The part of [`Config`] the sequencer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerSettings {
    pub readiness_mode: ReadinessMode,
    pub desired_delay_secs: f64,
    pub save_delay_secs: f64,
    pub notification_extra_delay_secs: f64,
    pub phases: PhaseDurations,
}

impl From<&Config> for SequencerSettings {
    fn from(config: &Config) -> Self {
        Self {
            readiness_mode: config.readiness.mode,
            desired_delay_secs: config.readiness.desired_delay_secs,
            save_delay_secs: config.timing.save_delay_secs,
            notification_extra_delay_secs: config.timing.notification_extra_delay_secs,
            phases: config.phases.clone(),
        }
    }
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// What a timer does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TimerAction {
    /// A clip finished; `then` is the chained clip still to play.
    CueFinished {
        phase: PhaseId,
        cue: Cue,
        then: Option<Cue>,
    },
    /// The final phase's notification delay elapsed.
    NotificationDue { phase: PhaseId },
    Save,
}

pub struct PhaseSequencer {
    session: ExaminationSession,
    gate: ReadinessGate,
    timers: TimerQueue<TimerAction>,
    sink: MeasurementSink,
    clips: ClipLengths,
    settings: SequencerSettings,
    /// Seconds since `origin`, advanced only by `tick`.
    clock: f64,
    origin: DateTime<Local>,
    devices: Collaborators,
}

impl PhaseSequencer {
    /// # Errors
    ///
    /// See [`PhaseSequencer::with_origin`].
    pub fn new(settings: SequencerSettings, devices: Collaborators) -> Result<Self, ConfigError> {
        Self::with_origin(settings, devices, Local::now())
    }

    /// Builds a sequencer whose clock reads `origin` before the first tick.
    ///
    /// Clip lengths are captured from the audio player here and the phase
    /// table is resolved once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a negative or non-finite
    /// duration, delay or clip length.
    pub fn with_origin(
        settings: SequencerSettings,
        devices: Collaborators,
        origin: DateTime<Local>,
    ) -> Result<Self, ConfigError> {
        check_duration("readiness.desired_delay_secs", settings.desired_delay_secs)?;
        check_duration("timing.save_delay_secs", settings.save_delay_secs)?;
        let clips = ClipLengths::capture(devices.audio.as_ref())?;
        let phases = PhaseTable::resolve(
            &settings.phases,
            settings.notification_extra_delay_secs,
            &clips,
        )?;

        info!(
            readiness_mode = ?settings.readiness_mode,
            desired_delay_secs = settings.desired_delay_secs,
            intro_clip_secs = clips.get(Cue::Intro),
            save_delay_secs = settings.save_delay_secs,
            "phase sequencer initialized"
        );

        Ok(Self {
            session: ExaminationSession::new(phases, origin),
            gate: ReadinessGate::new(settings.readiness_mode, settings.desired_delay_secs),
            timers: TimerQueue::new(),
            sink: MeasurementSink::new(),
            clips,
            settings,
            clock: 0.0,
            origin,
            devices,
        })
    }

    pub fn session(&self) -> &ExaminationSession {
        &self.session
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    pub fn clips(&self) -> &ClipLengths {
        &self.clips
    }

    pub fn current_phase(&self) -> PhaseId {
        self.session.current_phase()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn epoch(&self) -> u64 {
        self.timers.epoch()
    }

    /// Timers of the current epoch still waiting to fire.
    pub fn pending_timers(&self) -> usize {
        self.timers.live_len()
    }

    pub fn records_written(&self) -> u64 {
        self.sink.records_written()
    }

    /// Wall time as seen by the sequencer: origin plus accumulated ticks.
    pub fn now(&self) -> DateTime<Local> {
        self.origin + Duration::microseconds((self.clock * 1_000_000.0).round() as i64)
    }

    /// Advances the examination by `delta_secs` and returns what happened.
    ///
    /// Negative or non-finite deltas are ignored.
    pub fn tick(&mut self, delta_secs: f64) -> Vec<Event> {
        let mut events = Vec::new();
        if !delta_secs.is_finite() || delta_secs < 0.0 {
            warn!(delta_secs, "ignoring tick with invalid delta");
            return events;
        }
        self.clock += delta_secs;

        let due = self.timers.drain_due(self.clock);
        if due.stale > 0 {
            debug!(
                stale = due.stale,
                epoch = self.timers.epoch(),
                "discarded timers from an earlier session"
            );
        }
        for action in due.fired {
            self.on_timer(action, &mut events);
        }

        if self.session.current_phase().samples() {
            let at = self.now();
            self.sink.record(
                &mut self.session.log,
                self.devices.gaze.as_mut(),
                self.devices.head.as_mut(),
                at,
            );
        }

        self.step(delta_secs, &mut events);
        events
    }

    /// Returns to the readiness gate with an empty log.
    ///
    /// Pending timers are not cancelled; bumping the epoch makes them inert.
    pub fn reset(&mut self) -> Event {
        let epoch = self.timers.advance_epoch();
        let at = self.now();
        self.session.restart(at);
        self.gate.reset();
        info!(epoch, session_id = %self.session.id(), "session reset");
        Event::SessionReset {
            session_id: self.session.id(),
            epoch,
            at,
        }
    }

    /// Appends a free-text marker to the session log.
    pub(crate) fn append_marker(&mut self, text: String) {
        debug!(marker = %text, "marker appended");
        self.session.log.push_marker(text);
    }

    /// Plays `cue` without waiting for it.
    pub(crate) fn announce(&mut self, cue: Cue) {
        debug!(cue = cue.as_str(), "announcement");
        self.devices.audio.play(cue);
    }

    fn step(&mut self, delta_secs: f64, events: &mut Vec<Event>) {
        let phase = self.session.current_phase();
        let exit = self.session.current_descriptor().exit;
        match exit {
            ExitRule::Readiness => {
                let at = self.now();
                let sample = self.devices.gaze.sample(EyeKind::Combined, Space::Camera, at);
                if self.gate.is_ready(&sample, self.clock) {
                    info!(
                        mode = ?self.gate.mode(),
                        desired_delay_secs = self.gate.desired_delay_secs(),
                        "readiness reached"
                    );
                    events.push(Event::ReadinessReached { at });
                    self.advance(events);
                }
            }
            ExitRule::Elapsed => {
                self.request_cue(phase, events);
                if !self.session.runtime().get(phase).audio_cue_started {
                    return;
                }
                self.write_marker(phase, events);
                let effective = self.session.current_descriptor().effective_duration_secs;
                let state = self.session.state_mut(phase);
                if state.elapsed < effective {
                    state.elapsed += delta_secs;
                }
                if state.elapsed >= effective {
                    self.advance(events);
                }
            }
            ExitRule::CuesCompleted => {
                self.request_cue(phase, events);
                let delay = self.session.current_descriptor().notification_delay_secs;
                let state = self.session.state_mut(phase);
                if !state.notification_scheduled {
                    state.notification_scheduled = true;
                    self.timers
                        .after(self.clock, delay, TimerAction::NotificationDue { phase });
                    debug!(phase = ?phase, delay_secs = delay, "notification scheduled");
                }
                let state = self.session.runtime().get(phase);
                if state.audio_cue_started && state.notification_done {
                    self.advance(events);
                }
            }
            ExitRule::Never => {}
        }
    }

    fn on_timer(&mut self, action: TimerAction, events: &mut Vec<Event>) {
        match action {
            TimerAction::CueFinished { phase, cue, then } => {
                if phase != self.session.current_phase() {
                    debug!(phase = ?phase, cue = cue.as_str(), "cue finished outside its phase");
                    return;
                }
                debug!(phase = ?phase, cue = cue.as_str(), "cue finished");
                events.push(Event::CueCompleted {
                    phase,
                    cue,
                    at: self.now(),
                });
                match then {
                    Some(next) => self.start_cue(phase, next, None, events),
                    None => self.session.state_mut(phase).audio_cue_started = true,
                }
            }
            TimerAction::NotificationDue { phase } => {
                if phase != self.session.current_phase() {
                    return;
                }
                self.write_marker(phase, events);
                if let Some(cue) = self.session.phases().phase(phase).notification_cue {
                    self.devices.audio.play(cue);
                    info!(phase = ?phase, cue = cue.as_str(), "notification played");
                    events.push(Event::CueStarted {
                        phase,
                        cue,
                        duration_secs: self.clips.get(cue),
                        at: self.now(),
                    });
                }
                self.session.state_mut(phase).notification_done = true;
            }
            TimerAction::Save => self.execute_save(events),
        }
    }

    /// Issues the phase's cue, or its chain, once per activation.
    fn request_cue(&mut self, phase: PhaseId, events: &mut Vec<Event>) {
        let descriptor = self.session.phases().phase(phase);
        let (preceding, primary) = (descriptor.preceding_cue, descriptor.primary_cue);
        let state = self.session.state_mut(phase);
        if state.cue_requested {
            return;
        }
        state.cue_requested = true;
        match (preceding, primary) {
            (_, None) => state.audio_cue_started = true,
            (None, Some(cue)) => self.start_cue(phase, cue, None, events),
            (Some(first), Some(cue)) => self.start_cue(phase, first, Some(cue), events),
        }
    }

    fn start_cue(&mut self, phase: PhaseId, cue: Cue, then: Option<Cue>, events: &mut Vec<Event>) {
        self.devices.audio.play(cue);
        let duration = self.clips.get(cue);
        self.timers
            .after(self.clock, duration, TimerAction::CueFinished { phase, cue, then });
        info!(phase = ?phase, cue = cue.as_str(), duration_secs = duration, "cue started");
        events.push(Event::CueStarted {
            phase,
            cue,
            duration_secs: duration,
            at: self.now(),
        });
    }

    fn write_marker(&mut self, phase: PhaseId, events: &mut Vec<Event>) {
        let state = self.session.state_mut(phase);
        if state.marker_written {
            return;
        }
        state.marker_written = true;

        let at = self.now();
        let stamp = at.format(TIMESTAMP_FORMAT).to_string();
        let label = self.session.label();
        let Some(text) = self.session.phases().phase(phase).render_marker(&stamp, &label) else {
            return;
        };
        info!(phase = ?phase, "marker written");
        self.session.log.push_marker(text);
        events.push(Event::MarkerWritten { phase, at });
    }

    fn advance(&mut self, events: &mut Vec<Event>) {
        let Some(next) = self.session.advance() else {
            return;
        };
        info!(phase = ?next, index = next.ordinal(), "phase entered");
        events.push(Event::PhaseEntered {
            phase: next,
            index: next.ordinal(),
            at: self.now(),
        });
        if next == PhaseId::Finalize {
            self.arm_save(events);
        }
    }

    fn arm_save(&mut self, events: &mut Vec<Event>) {
        let delay = self.settings.save_delay_secs;
        if let Some(fire_at) =
            self.session
                .save
                .arm_once(&mut self.timers, self.clock, delay, TimerAction::Save)
        {
            info!(delay_secs = delay, fire_at, "save armed");
            events.push(Event::SaveArmed {
                delay_secs: delay,
                at: self.now(),
            });
        }
    }

    fn execute_save(&mut self, events: &mut Vec<Event>) {
        if !self.session.save.take_fire() {
            debug!("save already executed for this session");
            return;
        }
        let saved_at = self.now();
        self.session.log.push_marker(format!(
            "Save is executed at: {}",
            saved_at.format(TIMESTAMP_FORMAT)
        ));
        let request = PersistRequest {
            session_label: self.session.label(),
            saved_at,
            text: self.session.log.render(),
        };

        match self.devices.storage.persist(&request) {
            Ok(location) => {
                info!(
                    label = %request.session_label,
                    location = %location,
                    bytes = request.text.len(),
                    "session saved"
                );
                self.devices.audio.play(Cue::Notification);
                events.push(Event::SessionSaved {
                    label: request.session_label,
                    location,
                    bytes: request.text.len(),
                    at: saved_at,
                });
            }
            Err(e) => {
                error!(label = %request.session_label, error = %e, "session save failed");
                events.push(Event::SaveFailed {
                    label: request.session_label,
                    message: e.to_string(),
                    at: saved_at,
                });
            }
        }
    }
}
