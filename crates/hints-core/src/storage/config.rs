//! TOML-based examination configuration.
//!
//! Stores:
//! - Readiness mode and the sustained-tracking delay
//! - Tick rate, save delay and the final-phase notification delay
//! - Base durations of the timed phases
//! - Clip lengths for the simulated audio player
//! - Output location of saved sessions
//!
//! Configuration is stored at `~/.config/hints-exam/config.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::audio::Cue;
use crate::error::{ConfigError, Result, StorageError};
use crate::phase::{check_duration, PhaseDurations};
use crate::readiness::ReadinessMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default)]
    pub mode: ReadinessMode,
    #[serde(default = "default_desired_delay")]
    pub desired_delay_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f64,
    #[serde(default = "default_save_delay")]
    pub save_delay_secs: f64,
    /// Fixed wait before the notification cue of the final phase.
    #[serde(default = "default_notification_extra_delay")]
    pub notification_extra_delay_secs: f64,
}

/// Clip lengths in seconds, keyed by cue name (`intro`, `look_left`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_clips")]
    pub clips: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for saved sessions; the data directory when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub phases: PhaseDurations,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_desired_delay() -> f64 {
    0.2
}
fn default_tick_rate() -> f64 {
    90.0
}
fn default_save_delay() -> f64 {
    120.0
}
fn default_notification_extra_delay() -> f64 {
    2.0
}
fn default_file_suffix() -> String {
    "_longmessage".to_string()
}
fn default_clips() -> BTreeMap<String, f64> {
    [
        (Cue::SayName, 3.0),
        (Cue::Intro, 12.0),
        (Cue::FreeGaze, 6.0),
        (Cue::HoldStill, 3.0),
        (Cue::FixateNear, 4.0),
        (Cue::LookLeft, 3.0),
        (Cue::LookRight, 3.0),
        (Cue::LookUp, 3.0),
        (Cue::LookDown, 3.0),
        (Cue::Notification, 1.0),
    ]
    .into_iter()
    .map(|(cue, secs)| (cue.as_str().to_string(), secs))
    .collect()
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            mode: ReadinessMode::default(),
            desired_delay_secs: default_desired_delay(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate(),
            save_delay_secs: default_save_delay(),
            notification_extra_delay_secs: default_notification_extra_delay(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            clips: default_clips(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            file_suffix: default_file_suffix(),
        }
    }
}

impl AudioConfig {
    /// Configured length of `cue`, zero when absent.
    pub fn clip_secs(&self, cue: Cue) -> f64 {
        self.clips.get(cue.as_str()).copied().unwrap_or(0.0)
    }

    /// Same length for every cue.
    pub fn uniform(secs: f64) -> Self {
        Self {
            clips: Cue::ALL
                .into_iter()
                .map(|cue| (cue.as_str().to_string(), secs))
                .collect(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    ConfigError::invalid(key, format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(ConfigError::invalid(
                                key,
                                format!("cannot parse '{value}' as number"),
                            ));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)
                            .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `config.toml` inside the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Same as [`Config::load`] for an explicit file.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(StorageError::io(path, e).into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// See [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// The value is parsed according to the type already stored under the
    /// key, and the resulting configuration must pass [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result is invalid. `self` is left unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()?;
        Ok(())
    }

    /// Rejects values the sequencer cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad key.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_duration("readiness.desired_delay_secs", self.readiness.desired_delay_secs)?;
        if !self.timing.tick_rate_hz.is_finite() || self.timing.tick_rate_hz <= 0.0 {
            return Err(ConfigError::invalid(
                "timing.tick_rate_hz",
                format!("tick rate must be positive, got {}", self.timing.tick_rate_hz),
            ));
        }
        check_duration("timing.save_delay_secs", self.timing.save_delay_secs)?;
        check_duration(
            "timing.notification_extra_delay_secs",
            self.timing.notification_extra_delay_secs,
        )?;
        self.phases.validate()?;
        for (name, secs) in &self.audio.clips {
            let key = format!("audio.clips.{name}");
            if Cue::from_str(name).is_none() {
                return Err(ConfigError::UnknownKey(key));
            }
            check_duration(&key, *secs)?;
        }
        if self.storage.file_suffix.contains(['/', '\\']) {
            return Err(ConfigError::invalid(
                "storage.file_suffix",
                "suffix must not contain path separators",
            ));
        }
        Ok(())
    }

    /// Seconds between two ticks.
    pub fn tick_interval_secs(&self) -> f64 {
        1.0 / self.timing.tick_rate_hz
    }

    /// Directory saved sessions go under.
    ///
    /// # Errors
    ///
    /// Returns an error if no output dir is configured and the data
    /// directory cannot be created.
    pub fn output_root(&self) -> Result<PathBuf> {
        match &self.storage.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[timing]\nsave_delay_secs = 5.0\n").unwrap();
        assert_eq!(parsed.timing.save_delay_secs, 5.0);
        assert_eq!(parsed.timing.tick_rate_hz, 90.0);
        assert_eq!(parsed.phases.free_gaze_secs, 60.0);
        assert_eq!(parsed.storage.file_suffix, "_longmessage");
    }

    #[test]
    fn readiness_mode_uses_kebab_case() {
        let parsed: Config = toml::from_str("[readiness]\nmode = \"editor-simulation\"\n").unwrap();
        assert_eq!(parsed.readiness.mode, ReadinessMode::EditorSimulation);
        assert_eq!(parsed.readiness.desired_delay_secs, 0.2);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("readiness.mode").as_deref(), Some("device-tracking"));
        assert_eq!(cfg.get("phases.intro_secs").as_deref(), Some("2.0"));
        assert_eq!(cfg.get("audio.clips.notification").as_deref(), Some("1.0"));
        assert!(cfg.get("timing.missing_key").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "timing.tick_rate_hz", "30").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "timing.tick_rate_hz").unwrap(),
            &serde_json::Value::Number(30.into())
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "timing.nonexistent_key", "1");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_parses_fractional_seconds() {
        let mut cfg = Config::default();
        cfg.apply("phases.look_left_secs", "7.5").unwrap();
        assert_eq!(cfg.phases.look_left_secs, 7.5);
    }

    #[test]
    fn apply_sets_optional_output_dir() {
        let mut cfg = Config::default();
        cfg.apply("storage.output_dir", "/tmp/hints").unwrap();
        assert_eq!(cfg.storage.output_dir, Some(PathBuf::from("/tmp/hints")));
    }

    #[test]
    fn apply_rejects_invalid_values_and_keeps_state() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timing.tick_rate_hz", "fast").is_err());
        assert!(cfg.apply("timing.tick_rate_hz", "0").is_err());
        assert!(cfg.apply("phases.intro_secs", "-1").is_err());
        assert!(cfg.apply("readiness.mode", "sideways").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn validate_rejects_unknown_clip() {
        let mut cfg = Config::default();
        cfg.audio.clips.insert("bling".into(), 1.0);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("audio.clips.bling"));
    }

    #[test]
    fn validate_rejects_negative_clip() {
        let mut cfg = Config::default();
        cfg.audio.clips.insert("intro".into(), -3.0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "audio.clips.intro"
        ));
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timing\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }

    #[test]
    fn load_from_keeps_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let garbage = [0xff, 0xfe, 0x00, 0x80];
        std::fs::write(&path, garbage).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::Io { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), garbage);
    }

    #[test]
    fn load_from_reports_directory_in_place_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::Io { .. })));
        assert!(dir.path().is_dir());
    }

    #[test]
    fn clip_lengths_default_for_every_cue() {
        let cfg = Config::default();
        for cue in Cue::ALL {
            assert!(cfg.audio.clips.contains_key(cue.as_str()));
        }
        assert_eq!(AudioConfig::uniform(0.0).clip_secs(Cue::Intro), 0.0);
    }

    #[test]
    fn tick_interval_is_reciprocal_of_rate() {
        let mut cfg = Config::default();
        cfg.timing.tick_rate_hz = 10.0;
        assert!((cfg.tick_interval_secs() - 0.1).abs() < 1e-12);
    }
}
