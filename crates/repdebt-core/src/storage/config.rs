//! TOML-based deployment configuration.
//!
//! Holds the challenge parameters (start date, base quota), the single fixed
//! time zone calendar days are counted in, the daily trigger times, and the
//! ledger location.
//!
//! Configuration is stored at `~/.config/repdebt/config.toml`.

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::ledger::ChallengeCalendar;

/// Challenge parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_base_quota")]
    pub base_quota: u32,
}

/// One named daily trigger, e.g. `morning` at `08:00`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,
    /// Wall-clock time in the configured offset, `HH:MM`.
    pub time: String,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Offset from UTC all calendar days are counted in, e.g. `+03:00`.
    /// A fixed offset never shifts across daylight-saving changes.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_triggers")]
    pub triggers: Vec<TriggerConfig>,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Ledger file; defaults to `<data_dir>/ledger.json`.
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/repdebt/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

// Default functions
fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 9).unwrap_or_default()
}
fn default_base_quota() -> u32 {
    10
}
fn default_utc_offset() -> String {
    "+00:00".into()
}
fn default_triggers() -> Vec<TriggerConfig> {
    vec![
        TriggerConfig {
            name: "morning".into(),
            time: "08:00".into(),
        },
        TriggerConfig {
            name: "evening".into(),
            time: "22:00".into(),
        },
    ]
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            base_quota: default_base_quota(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            triggers: default_triggers(),
        }
    }
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
pub(crate) fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    value.parse::<FixedOffset>().ok()
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
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::invalid(key, "unknown config key");
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::invalid(key, "config key is empty"));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| {
                            ConfigError::invalid(key, format!("cannot parse '{value}' as number"))
                        })?,
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
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

    /// Default config location inside the data directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/repdebt"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
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

    /// Set a config value by key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        Ok(())
    }

    pub fn calendar(&self) -> ChallengeCalendar {
        ChallengeCalendar::new(self.challenge.start_date, self.challenge.base_quota)
    }

    /// The fixed time zone calendar days are counted in.
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_utc_offset(&self.schedule.utc_offset).ok_or_else(|| {
            ConfigError::invalid(
                "schedule.utc_offset",
                format!("'{}' is not an offset like +03:00", self.schedule.utc_offset),
            )
        })
    }

    /// Trigger names with their parsed wall-clock times.
    pub fn trigger_times(&self) -> Result<Vec<(String, NaiveTime)>, ConfigError> {
        self.schedule
            .triggers
            .iter()
            .map(|t| {
                NaiveTime::parse_from_str(&t.time, "%H:%M")
                    .map(|time| (t.name.clone(), time))
                    .map_err(|_| {
                        ConfigError::invalid(
                            "schedule.triggers",
                            format!("trigger '{}' has invalid time '{}', expected HH:MM", t.name, t.time),
                        )
                    })
            })
            .collect()
    }

    /// Ledger file location, from config or the data directory.
    pub fn ledger_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.ledger_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()
                .map_err(|e| ConfigError::invalid("storage.ledger_path", e.to_string()))?
                .join("ledger.json")),
        }
    }

    /// Startup checks. `today` is the current date in the configured offset.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: zero quota, bad offset, missing,
    /// unnamed, duplicate or unparseable triggers, or a start date after
    /// `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ConfigError> {
        if self.challenge.base_quota == 0 {
            return Err(ConfigError::invalid("challenge.base_quota", "must be at least 1"));
        }
        if self.challenge.start_date > today {
            return Err(ConfigError::invalid(
                "challenge.start_date",
                format!(
                    "{} is after today ({today}); day numbers would be negative",
                    self.challenge.start_date
                ),
            ));
        }
        self.offset()?;

        if self.schedule.triggers.is_empty() {
            return Err(ConfigError::invalid("schedule.triggers", "at least one trigger is required"));
        }

        let mut names = HashSet::new();
        let mut times = HashSet::new();
        for (name, time) in self.trigger_times()? {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid("schedule.triggers", "trigger name is empty"));
            }
            if !names.insert(name.clone()) {
                return Err(ConfigError::invalid(
                    "schedule.triggers",
                    format!("duplicate trigger name '{name}'"),
                ));
            }
            if !times.insert(time) {
                return Err(ConfigError::invalid(
                    "schedule.triggers",
                    format!("trigger '{name}' fires at {time}, same as another trigger"),
                ));
            }
        }
        Ok(())
    }
}
