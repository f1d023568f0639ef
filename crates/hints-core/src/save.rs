//! One-shot delayed persistence of the session log.
//!
//! Arming and firing are both guarded, so neither a second arm nor a
//! duplicated timer entry can persist the same session twice.

use serde::Serialize;

use crate::timer::TimerQueue;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveSchedule {
    pub scheduled: bool,
    /// Sequencer clock value at which the save fires.
    pub fire_at: Option<f64>,
    pub persisted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SaveScheduler {
    schedule: SaveSchedule,
}

impl SaveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self) -> &SaveSchedule {
        &self.schedule
    }

    pub fn is_armed(&self) -> bool {
        self.schedule.scheduled
    }

    /// Schedules `payload` on `timers` unless a save is already armed.
    ///
    /// Returns the fire time when this call armed the save.
    pub fn arm_once<T>(
        &mut self,
        timers: &mut TimerQueue<T>,
        now: f64,
        delay_secs: f64,
        payload: T,
    ) -> Option<f64> {
        if self.schedule.scheduled {
            return None;
        }
        let fire_at = timers.after(now, delay_secs, payload);
        self.schedule.scheduled = true;
        self.schedule.fire_at = Some(fire_at);
        Some(fire_at)
    }

    /// Claims the right to persist. True at most once per armed schedule.
    pub fn take_fire(&mut self) -> bool {
        if !self.schedule.scheduled || self.schedule.persisted {
            return false;
        }
        self.schedule.persisted = true;
        true
    }

    pub fn reset(&mut self) {
        self.schedule = SaveSchedule::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_arm_is_ignored() {
        let mut timers = TimerQueue::new();
        let mut save = SaveScheduler::new();

        assert_eq!(save.arm_once(&mut timers, 1.0, 120.0, "save"), Some(121.0));
        assert_eq!(save.arm_once(&mut timers, 5.0, 120.0, "save"), None);
        assert_eq!(timers.live_len(), 1);
        assert_eq!(save.schedule().fire_at, Some(121.0));
    }

    #[test]
    fn fires_exactly_once() {
        let mut timers = TimerQueue::new();
        let mut save = SaveScheduler::new();
        assert!(!save.take_fire());

        save.arm_once(&mut timers, 0.0, 1.0, ());
        assert!(save.take_fire());
        assert!(!save.take_fire());
        assert!(save.schedule().persisted);
    }

    #[test]
    fn reset_allows_a_new_arm() {
        let mut timers = TimerQueue::new();
        let mut save = SaveScheduler::new();
        save.arm_once(&mut timers, 0.0, 1.0, ());
        save.reset();
        assert!(!save.is_armed());
        assert!(save.arm_once(&mut timers, 2.0, 1.0, ()).is_some());
    }
}
