use serde::{Deserialize, Serialize};

use crate::audio::{ClipLengths, Cue};
use crate::error::ConfigError;

/// The examination phases, in clinical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    /// Waits for sustained tracking. Never samples, never plays audio.
    ReadinessGate,
    Intro,
    FreeGaze,
    HoldStill,
    FixateNear,
    LookLeft,
    LookRight,
    LookUp,
    LookDown,
    /// Second near-fixation combined with head movement.
    FixateNearHeadMovement,
    /// Terminal: keeps sampling and arms the delayed save.
    Finalize,
}

impl PhaseId {
    pub const ALL: [PhaseId; 11] = [
        PhaseId::ReadinessGate,
        PhaseId::Intro,
        PhaseId::FreeGaze,
        PhaseId::HoldStill,
        PhaseId::FixateNear,
        PhaseId::LookLeft,
        PhaseId::LookRight,
        PhaseId::LookUp,
        PhaseId::LookDown,
        PhaseId::FixateNearHeadMovement,
        PhaseId::Finalize,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Whether the measurement sink runs while this phase is active.
    pub fn samples(self) -> bool {
        self != PhaseId::ReadinessGate
    }
}

/// How a phase decides it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    /// The readiness gate opened.
    Readiness,
    /// The primary cue finished and `elapsed` reached the effective duration.
    Elapsed,
    /// Both the primary cue and the delayed notification cue finished.
    CuesCompleted,
    /// Terminal phase.
    Never,
}

/// Immutable description of one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseDescriptor {
    pub id: PhaseId,
    pub ordinal: usize,
    /// Played to completion before `primary_cue` starts.
    pub preceding_cue: Option<Cue>,
    pub primary_cue: Option<Cue>,
    /// Played after `notification_delay_secs`, independent of the primary cue.
    pub notification_cue: Option<Cue>,
    pub base_duration_secs: f64,
    /// `base_duration_secs` plus the length of the primary cue.
    pub effective_duration_secs: f64,
    pub notification_delay_secs: f64,
    /// Marker template; `{now}` and `{session}` are substituted when written.
    pub marker_text: Option<String>,
    pub exit: ExitRule,
}

impl PhaseDescriptor {
    /// Renders the marker line body for this phase, if it has one.
    pub fn render_marker(&self, now: &str, session: &str) -> Option<String> {
        self.marker_text
            .as_ref()
            .map(|template| template.replace("{now}", now).replace("{session}", session))
    }
}

/// Base durations (seconds) of the timed phases, before clip lengths are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDurations {
    #[serde(default = "default_intro")]
    pub intro_secs: f64,
    #[serde(default = "default_free_gaze")]
    pub free_gaze_secs: f64,
    #[serde(default = "default_hold_still")]
    pub hold_still_secs: f64,
    #[serde(default = "default_fixation")]
    pub fixate_near_secs: f64,
    #[serde(default = "default_fixation")]
    pub look_left_secs: f64,
    #[serde(default = "default_fixation")]
    pub look_right_secs: f64,
    #[serde(default = "default_fixation")]
    pub look_up_secs: f64,
    #[serde(default = "default_fixation")]
    pub look_down_secs: f64,
}

fn default_intro() -> f64 {
    2.0
}
fn default_free_gaze() -> f64 {
    60.0
}
fn default_hold_still() -> f64 {
    10.0
}
fn default_fixation() -> f64 {
    15.0
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            intro_secs: default_intro(),
            free_gaze_secs: default_free_gaze(),
            hold_still_secs: default_hold_still(),
            fixate_near_secs: default_fixation(),
            look_left_secs: default_fixation(),
            look_right_secs: default_fixation(),
            look_up_secs: default_fixation(),
            look_down_secs: default_fixation(),
        }
    }
}

impl PhaseDurations {
    /// Same base duration for every timed phase.
    pub fn uniform(secs: f64) -> Self {
        Self {
            intro_secs: secs,
            free_gaze_secs: secs,
            hold_still_secs: secs,
            fixate_near_secs: secs,
            look_left_secs: secs,
            look_right_secs: secs,
            look_up_secs: secs,
            look_down_secs: secs,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("intro_secs", self.intro_secs),
            ("free_gaze_secs", self.free_gaze_secs),
            ("hold_still_secs", self.hold_still_secs),
            ("fixate_near_secs", self.fixate_near_secs),
            ("look_left_secs", self.look_left_secs),
            ("look_right_secs", self.look_right_secs),
            ("look_up_secs", self.look_up_secs),
            ("look_down_secs", self.look_down_secs),
        ]
    }

    /// # Errors
    ///
    /// Returns an error naming the first negative or non-finite duration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, secs) in self.entries() {
            check_duration(&format!("phases.{key}"), secs)?;
        }
        Ok(())
    }
}

pub(crate) fn check_duration(key: &str, secs: f64) -> Result<(), ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::invalid(
            key,
            format!("duration must be a non-negative number of seconds, got {secs}"),
        ));
    }
    Ok(())
}

/// Ordered phase table with effective durations resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTable {
    phases: Vec<PhaseDescriptor>,
}

impl PhaseTable {
    /// Builds the examination's phase table.
    ///
    /// Effective durations are computed here, once, from the captured clip
    /// lengths.
    ///
    /// # Errors
    ///
    /// Returns an error if any base duration or the notification delay is
    /// negative or non-finite.
    pub fn resolve(
        durations: &PhaseDurations,
        notification_extra_delay_secs: f64,
        clips: &ClipLengths,
    ) -> Result<Self, ConfigError> {
        durations.validate()?;
        check_duration(
            "timing.notification_extra_delay_secs",
            notification_extra_delay_secs,
        )?;

        let timed = |id: PhaseId, preceding: Option<Cue>, primary: Cue, base: f64, marker: &str| {
            PhaseDescriptor {
                id,
                ordinal: id.ordinal(),
                preceding_cue: preceding,
                primary_cue: Some(primary),
                notification_cue: None,
                base_duration_secs: base,
                effective_duration_secs: base + clips.get(primary),
                notification_delay_secs: 0.0,
                marker_text: Some(marker.to_string()),
                exit: ExitRule::Elapsed,
            }
        };

        let phases = vec![
            PhaseDescriptor {
                id: PhaseId::ReadinessGate,
                ordinal: PhaseId::ReadinessGate.ordinal(),
                preceding_cue: None,
                primary_cue: None,
                notification_cue: None,
                base_duration_secs: 0.0,
                effective_duration_secs: 0.0,
                notification_delay_secs: 0.0,
                marker_text: None,
                exit: ExitRule::Readiness,
            },
            timed(
                PhaseId::Intro,
                None,
                Cue::Intro,
                durations.intro_secs,
                "Start recording: {now}, , started application at {session}",
            ),
            timed(
                PhaseId::FreeGaze,
                None,
                Cue::FreeGaze,
                durations.free_gaze_secs,
                "Start raum instructions at: {now}",
            ),
            timed(
                PhaseId::HoldStill,
                None,
                Cue::HoldStill,
                durations.hold_still_secs,
                "Start still instructions at: {now}",
            ),
            timed(
                PhaseId::FixateNear,
                None,
                Cue::FixateNear,
                durations.fixate_near_secs,
                "Start nase instructions at: {now}",
            ),
            timed(
                PhaseId::LookLeft,
                None,
                Cue::LookLeft,
                durations.look_left_secs,
                "Start links instructions at: {now}",
            ),
            timed(
                PhaseId::LookRight,
                None,
                Cue::LookRight,
                durations.look_right_secs,
                "Start rechts instructions at: {now}",
            ),
            timed(
                PhaseId::LookUp,
                Some(Cue::HoldStill),
                Cue::LookUp,
                durations.look_up_secs,
                "Start decke instructions at: {now}",
            ),
            timed(
                PhaseId::LookDown,
                Some(Cue::HoldStill),
                Cue::LookDown,
                durations.look_down_secs,
                "Start boden instructions at: {now}",
            ),
            PhaseDescriptor {
                id: PhaseId::FixateNearHeadMovement,
                ordinal: PhaseId::FixateNearHeadMovement.ordinal(),
                preceding_cue: None,
                primary_cue: Some(Cue::FixateNear),
                notification_cue: Some(Cue::Notification),
                base_duration_secs: notification_extra_delay_secs,
                effective_duration_secs: notification_extra_delay_secs
                    + clips.get(Cue::FixateNear),
                notification_delay_secs: notification_extra_delay_secs
                    + clips.get(Cue::Notification),
                marker_text: Some("Start blingAudioSoundBool instructions at: {now}".to_string()),
                exit: ExitRule::CuesCompleted,
            },
            PhaseDescriptor {
                id: PhaseId::Finalize,
                ordinal: PhaseId::Finalize.ordinal(),
                preceding_cue: None,
                primary_cue: None,
                notification_cue: None,
                base_duration_secs: 0.0,
                effective_duration_secs: 0.0,
                notification_delay_secs: 0.0,
                marker_text: None,
                exit: ExitRule::Never,
            },
        ];

        Ok(Self { phases })
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Descriptor of `id`. A resolved table holds every phase at its ordinal.
    pub fn phase(&self, id: PhaseId) -> &PhaseDescriptor {
        &self.phases[id.ordinal()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseDescriptor> {
        self.phases.iter()
    }

    /// Sum of the effective durations of the timed phases.
    pub fn timed_total_secs(&self) -> f64 {
        self.phases
            .iter()
            .filter(|p| p.exit == ExitRule::Elapsed)
            .map(|p| p.effective_duration_secs)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioPlayer;

    struct Clips;

    impl AudioPlayer for Clips {
        fn play(&mut self, _cue: Cue) {}

        fn duration_of(&self, cue: Cue) -> f64 {
            match cue {
                Cue::Intro => 4.0,
                Cue::LookUp => 2.5,
                Cue::Notification => 0.5,
                Cue::FixateNear => 3.0,
                _ => 1.0,
            }
        }
    }

    fn table() -> PhaseTable {
        let clips = ClipLengths::capture(&Clips).unwrap();
        PhaseTable::resolve(&PhaseDurations::default(), 2.0, &clips).unwrap()
    }

    #[test]
    fn table_has_eleven_phases_in_ordinal_order() {
        let t = table();
        assert_eq!(t.len(), 11);
        for (i, p) in t.iter().enumerate() {
            assert_eq!(p.ordinal, i);
            assert_eq!(p.id, PhaseId::ALL[i]);
        }
    }

    #[test]
    fn effective_duration_adds_primary_clip() {
        let t = table();
        let clips = ClipLengths::capture(&Clips).unwrap();
        for p in t.iter() {
            if let Some(cue) = p.primary_cue {
                assert_eq!(p.effective_duration_secs, p.base_duration_secs + clips.get(cue));
            }
        }
        assert_eq!(t.phase(PhaseId::Intro).effective_duration_secs, 6.0);
        // The preamble does not count toward the duration.
        assert_eq!(t.phase(PhaseId::LookUp).effective_duration_secs, 17.5);
    }

    #[test]
    fn timed_total_skips_untimed_phases() {
        let t = table();
        // 6 + 61 + 11 + 18 + 16 + 16 + 17.5 + 16
        assert_eq!(t.timed_total_secs(), 161.5);
        let zero = PhaseTable::resolve(
            &PhaseDurations::uniform(0.0),
            2.0,
            &ClipLengths::capture(&Clips).unwrap(),
        )
        .unwrap();
        assert_eq!(zero.timed_total_secs(), 4.0 + 1.0 + 1.0 + 3.0 + 1.0 + 1.0 + 2.5 + 1.0);
    }

    #[test]
    fn look_up_and_down_chain_hold_still() {
        let t = table();
        for id in [PhaseId::LookUp, PhaseId::LookDown] {
            assert_eq!(t.phase(id).preceding_cue, Some(Cue::HoldStill));
        }
        assert_eq!(t.phase(PhaseId::LookLeft).preceding_cue, None);
    }

    #[test]
    fn final_phase_waits_for_both_cues() {
        let t = table();
        let p = t.phase(PhaseId::FixateNearHeadMovement);
        assert_eq!(p.exit, ExitRule::CuesCompleted);
        assert_eq!(p.notification_delay_secs, 2.5);
    }

    #[test]
    fn rejects_negative_duration() {
        let clips = ClipLengths::capture(&Clips).unwrap();
        let durations = PhaseDurations {
            look_left_secs: -1.0,
            ..PhaseDurations::default()
        };
        let err = PhaseTable::resolve(&durations, 2.0, &clips).unwrap_err();
        assert!(err.to_string().contains("phases.look_left_secs"));
    }

    #[test]
    fn rejects_infinite_notification_delay() {
        let clips = ClipLengths::capture(&Clips).unwrap();
        assert!(PhaseTable::resolve(&PhaseDurations::default(), f64::INFINITY, &clips).is_err());
    }

    #[test]
    fn marker_substitutes_placeholders() {
        let t = table();
        let intro = t.phase(PhaseId::Intro);
        assert_eq!(
            intro.render_marker("NOW", "LABEL").unwrap(),
            "Start recording: NOW, , started application at LABEL"
        );
        assert!(t.phase(PhaseId::Finalize).render_marker("a", "b").is_none());
    }
}
