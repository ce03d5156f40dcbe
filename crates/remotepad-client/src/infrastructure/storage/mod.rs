//! Preference persistence.
//!
//! - **`config`** – TOML config file in the platform config directory; also
//!   the production [`crate::application::manage_devices::PreferenceStore`].
//! - **`memory`** – In-process store used by tests and dry runs.

pub mod config;
pub mod memory;
