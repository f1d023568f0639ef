//! Readiness gate for leaving the initial phase.
//!
//! The examination only starts once the tracking condition has held without
//! interruption for longer than the configured delay. Any tick where the
//! condition fails restarts the wait from that tick.

use serde::{Deserialize, Serialize};

use crate::sensors::GazeSample;

/// Which gaze state counts as "ready".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessMode {
    /// Headset with live eye tracking: proceed once gaze is valid.
    #[default]
    DeviceTracking,
    /// Desktop run without an eye tracker: proceed once gaze is *invalid*,
    /// so the session can be exercised with no hardware attached.
    EditorSimulation,
}

impl ReadinessMode {
    pub fn holds(self, sample: &GazeSample) -> bool {
        match self {
            ReadinessMode::DeviceTracking => sample.valid,
            ReadinessMode::EditorSimulation => !sample.valid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadinessGate {
    mode: ReadinessMode,
    desired_delay_secs: f64,
    /// Clock value of the last failed check, or of the first check.
    since: Option<f64>,
}

impl ReadinessGate {
    pub fn new(mode: ReadinessMode, desired_delay_secs: f64) -> Self {
        Self {
            mode,
            desired_delay_secs,
            since: None,
        }
    }

    pub fn mode(&self) -> ReadinessMode {
        self.mode
    }

    pub fn desired_delay_secs(&self) -> f64 {
        self.desired_delay_secs
    }

    pub fn since(&self) -> Option<f64> {
        self.since
    }

    /// Evaluates one tick. The first call only starts the wait.
    pub fn is_ready(&mut self, sample: &GazeSample, now: f64) -> bool {
        let since = *self.since.get_or_insert(now);
        if self.mode.holds(sample) {
            now - since > self.desired_delay_secs
        } else {
            self.since = Some(now);
            false
        }
    }

    pub fn reset(&mut self) {
        self.since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{EyeKind, Space, Vector3};
    use proptest::prelude::*;

    fn valid() -> GazeSample {
        GazeSample::new(EyeKind::Combined, Space::Camera, Vector3::ZERO, Vector3::FORWARD)
    }

    fn invalid() -> GazeSample {
        GazeSample::invalid(EyeKind::Combined, Space::Camera)
    }

    #[test]
    fn opens_on_first_tick_past_delay() {
        let mut gate = ReadinessGate::new(ReadinessMode::DeviceTracking, 0.2);
        assert!(!gate.is_ready(&valid(), 0.0));
        assert!(!gate.is_ready(&valid(), 0.1));
        assert!(!gate.is_ready(&valid(), 0.2));
        assert!(gate.is_ready(&valid(), 0.3));
    }

    #[test]
    fn interruption_restarts_the_wait() {
        let mut gate = ReadinessGate::new(ReadinessMode::DeviceTracking, 0.2);
        gate.is_ready(&valid(), 0.0);
        assert!(!gate.is_ready(&invalid(), 0.25));
        assert_eq!(gate.since(), Some(0.25));
        assert!(!gate.is_ready(&valid(), 0.4));
        assert!(gate.is_ready(&valid(), 0.5));
    }

    #[test]
    fn editor_simulation_inverts_the_condition() {
        let mut gate = ReadinessGate::new(ReadinessMode::EditorSimulation, 0.2);
        gate.is_ready(&invalid(), 0.0);
        assert!(!gate.is_ready(&valid(), 1.0));
        assert!(gate.is_ready(&invalid(), 1.5));
    }

    #[test]
    fn reset_forgets_the_start() {
        let mut gate = ReadinessGate::new(ReadinessMode::DeviceTracking, 0.2);
        gate.is_ready(&valid(), 0.0);
        gate.reset();
        assert_eq!(gate.since(), None);
        assert!(!gate.is_ready(&valid(), 10.0));
    }

    proptest! {
        #[test]
        fn continuous_signal_opens_exactly_after_delay(
            delay_ms in 0u32..2000,
            tick_ms in 1u32..200,
        ) {
            let delay = f64::from(delay_ms) / 1000.0;
            let tick = f64::from(tick_ms) / 1000.0;
            let mut gate = ReadinessGate::new(ReadinessMode::DeviceTracking, delay);
            let mut n = 0u32;
            loop {
                let now = f64::from(n) * tick;
                let ready = gate.is_ready(&valid(), now);
                prop_assert_eq!(ready, now > delay);
                if ready {
                    break;
                }
                n += 1;
            }
        }
    }
}
