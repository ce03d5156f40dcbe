//! Application layer use cases for the RemotePad client.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the domain types in `remotepad-core`
//! and the infrastructure that talks to sockets, mDNS and the file system.
//! Code in here decides *what* happens; it reaches the outside world only
//! through traits ([`manage_devices::PreferenceStore`],
//! [`connect_device::SessionControl`]) that the infrastructure implements.
//!
//! # Sub-modules
//!
//! - **`capture_gesture`** – Classifies raw pointer events into motion and
//!   discrete commands (clicks, window-switcher key presses).
//!
//! - **`smooth_input`** – Accumulates motion between ticks and filters it
//!   through an EMA and a deadzone.  Runs once per tick while a session is
//!   open.
//!
//! - **`manage_devices`** – The registry of known hosts and the storage trait
//!   it persists through.
//!
//! - **`connect_device`** – Credential gate in front of the session, plus the
//!   foreground-reconnect trigger.
//!
//! - **`tune_settings`** – Live preview and commit of the input settings.
//!
//! - **`type_text`** – Text entry and key chords.

pub mod capture_gesture;
pub mod connect_device;
pub mod manage_devices;
pub mod smooth_input;
pub mod tune_settings;
pub mod type_text;
