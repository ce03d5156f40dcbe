//! TOML-based configuration and preference persistence.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\RemotePad\config.toml`
//! - Linux:    `~/.config/remotepad/config.toml`
//! - macOS:    `~/Library/Application Support/RemotePad/config.toml`
//!
//! The same file holds tunables (ports, timeouts, gesture thresholds), the
//! four input settings and the list of known devices:
//!
//! ```toml
//! [network]
//! host_port = 1212
//! browse_window_ms = 2000
//!
//! [settings]
//! sensitivity = 1.5
//! smooth_factor = 0.7
//!
//! [[devices]]
//! name = "Desk PC"
//! address = "10.0.0.5"
//! port = 1212
//! credential = "x"
//! reachable = true
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = ...)]`, so a missing file, a
//! missing section or a missing key all fall back to the built-in defaults.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use remotepad_core::protocol::{DEFAULT_HOST_PORT, SERVICE_TYPE};
use remotepad_core::{Device, SettingKey, Settings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::capture_gesture::GestureConfig;
use crate::application::manage_devices::{PreferenceStore, Preferences, StoreError};
use crate::application::smooth_input::TrailingPolicy;
use crate::infrastructure::discovery::DiscoveryConfig;
use crate::infrastructure::network::SessionConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A setting value was out of range.
    #[error(transparent)]
    Setting(#[from] remotepad_core::SettingsError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Schema version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Ports, service type and time limits for talking to hosts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Port probed on every subnet address.
    #[serde(default = "default_host_port")]
    pub host_port: u16,
    /// Fully qualified DNS-SD service type to browse.
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_browse_window_ms")]
    pub browse_window_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Gesture and smoothing tunables that are not user settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_tap_slop")]
    pub tap_slop: f64,
    #[serde(default = "default_switch_step_width")]
    pub switch_step_width: f64,
    #[serde(default)]
    pub trailing: TrailingPolicy,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_host_port() -> u16 {
    DEFAULT_HOST_PORT
}
fn default_service_type() -> String {
    SERVICE_TYPE.to_string()
}
fn default_browse_window_ms() -> u64 {
    2000
}
fn default_probe_timeout_ms() -> u64 {
    1200
}
fn default_refresh_timeout_ms() -> u64 {
    1000
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_tick_interval_ms() -> u64 {
    16
}
fn default_tap_slop() -> f64 {
    10.0
}
fn default_switch_step_width() -> f64 {
    70.0
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host_port: default_host_port(),
            service_type: default_service_type(),
            browse_window_ms: default_browse_window_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            tap_slop: default_tap_slop(),
            switch_step_width: default_switch_step_width(),
            trailing: TrailingPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            port: self.network.host_port,
            service_type: self.network.service_type.clone(),
            browse_window: Duration::from_millis(self.network.browse_window_ms),
            probe_timeout: Duration::from_millis(self.network.probe_timeout_ms),
            refresh_timeout: Duration::from_millis(self.network.refresh_timeout_ms),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_interval: Duration::from_millis(self.input.tick_interval_ms.max(1)),
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms),
            trailing: self.input.trailing,
            ..SessionConfig::default()
        }
    }

    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            tap_slop: self.input.tap_slop,
            switch_step_width: self.input.switch_step_width,
        }
        .sanitized()
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`AppConfig`] from `path`, returning defaults if the file does not
/// exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let mut cfg: AppConfig = toml::from_str(&content)?;
            cfg.settings = cfg.settings.sanitized();
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("RemotePad"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("remotepad"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("RemotePad")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Preference store ──────────────────────────────────────────────────────────

/// [`PreferenceStore`] backed by the TOML config file.
///
/// Every write re-reads the file and changes only its own part, so tunables
/// edited by hand survive.
pub struct TomlPreferenceStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl TomlPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modify(&self, change: impl FnOnce(&mut AppConfig) -> Result<(), ConfigError>) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Save("preference lock poisoned".to_string()))?;
        let mut cfg = load_config_from(&self.path).map_err(|e| StoreError::Load(e.to_string()))?;
        change(&mut cfg).map_err(|e| StoreError::Save(e.to_string()))?;
        save_config_to(&self.path, &cfg).map_err(|e| StoreError::Save(e.to_string()))
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn load(&self) -> Result<Preferences, StoreError> {
        let cfg = load_config_from(&self.path).map_err(|e| StoreError::Load(e.to_string()))?;
        Ok(Preferences {
            devices: cfg.devices,
            settings: cfg.settings,
        })
    }

    fn save_devices(&self, devices: &[Device]) -> Result<(), StoreError> {
        self.modify(|cfg| {
            cfg.devices = devices.to_vec();
            Ok(())
        })
    }

    fn save_setting(&self, key: SettingKey, value: f64) -> Result<(), StoreError> {
        self.modify(|cfg| Ok(cfg.settings.set(key, value)?))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
