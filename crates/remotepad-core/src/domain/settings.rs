//! User-tunable input settings.
//!
//! Each field is persisted on its own under a stable [`SettingKey`], so a
//! slider that finished moving only rewrites its own value.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest allowed smoothing factor; above this the cursor lags visibly.
pub const MAX_SMOOTHING_FACTOR: f64 = 0.9;

/// Errors raised when a setting value is outside its domain.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{key} must be {expected}, got {value}")]
    OutOfRange {
        key: SettingKey,
        value: f64,
        expected: &'static str,
    },
}

/// Stable persistence key of each setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    MoveSensitivity,
    ScrollSensitivity,
    SmoothingFactor,
    Deadzone,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::MoveSensitivity,
        SettingKey::ScrollSensitivity,
        SettingKey::SmoothingFactor,
        SettingKey::Deadzone,
    ];

    /// Key used in the `[settings]` table of the config file.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::MoveSensitivity => "sensitivity",
            SettingKey::ScrollSensitivity => "scroll_sensitivity",
            SettingKey::SmoothingFactor => "smooth_factor",
            SettingKey::Deadzone => "deadzone",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            SettingKey::MoveSensitivity | SettingKey::ScrollSensitivity => "greater than 0",
            SettingKey::SmoothingFactor => "between 0 and 0.9",
            SettingKey::Deadzone => "0 or greater",
        }
    }

    fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            SettingKey::MoveSensitivity | SettingKey::ScrollSensitivity => value > 0.0,
            SettingKey::SmoothingFactor => (0.0..=MAX_SMOOTHING_FACTOR).contains(&value),
            SettingKey::Deadzone => value >= 0.0,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How finger motion is scaled and filtered before it reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Multiplier applied to pointer deltas.
    #[serde(rename = "sensitivity", default = "default_move_sensitivity")]
    pub move_sensitivity: f64,

    /// Multiplier applied to two-finger scroll deltas.
    #[serde(default = "default_scroll_sensitivity")]
    pub scroll_sensitivity: f64,

    /// EMA weight of the previous value; 0 disables smoothing.
    #[serde(rename = "smooth_factor", default = "default_smoothing_factor")]
    pub smoothing_factor: f64,

    /// Filtered magnitude below which nothing is sent.
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
}

fn default_move_sensitivity() -> f64 {
    1.5
}

fn default_scroll_sensitivity() -> f64 {
    0.5
}

fn default_smoothing_factor() -> f64 {
    0.7
}

fn default_deadzone() -> f64 {
    0.6
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            move_sensitivity: default_move_sensitivity(),
            scroll_sensitivity: default_scroll_sensitivity(),
            smoothing_factor: default_smoothing_factor(),
            deadzone: default_deadzone(),
        }
    }
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> f64 {
        match key {
            SettingKey::MoveSensitivity => self.move_sensitivity,
            SettingKey::ScrollSensitivity => self.scroll_sensitivity,
            SettingKey::SmoothingFactor => self.smoothing_factor,
            SettingKey::Deadzone => self.deadzone,
        }
    }

    /// Sets one field after checking it against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::OutOfRange`] and leaves `self` untouched if the
    /// value is not acceptable for `key`.
    pub fn set(&mut self, key: SettingKey, value: f64) -> Result<(), SettingsError> {
        check(key, value)?;
        match key {
            SettingKey::MoveSensitivity => self.move_sensitivity = value,
            SettingKey::ScrollSensitivity => self.scroll_sensitivity = value,
            SettingKey::SmoothingFactor => self.smoothing_factor = value,
            SettingKey::Deadzone => self.deadzone = value,
        }
        Ok(())
    }

    /// Checks every field, reporting the first one out of range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        SettingKey::ALL
            .iter()
            .try_for_each(|&key| check(key, self.get(key)))
    }

    /// Replaces each out-of-range field with its default, keeping the rest.
    pub fn sanitized(self) -> Self {
        let defaults = Settings::default();
        let mut out = self;
        for key in SettingKey::ALL {
            if !key.accepts(out.get(key)) {
                tracing::warn!(
                    "setting {key} has invalid value {}; using default {}",
                    out.get(key),
                    defaults.get(key)
                );
                // Defaults are always in range.
                let _ = out.set(key, defaults.get(key));
            }
        }
        out
    }
}

fn check(key: SettingKey, value: f64) -> Result<(), SettingsError> {
    if key.accepts(value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            key,
            value,
            expected: key.expected(),
        })
    }
}
