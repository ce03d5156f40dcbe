//! Infrastructure layer for the client application.
//!
//! Contains the adapters that touch the outside world: the WebSocket
//! session, LAN discovery, and the TOML preference file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `remotepad_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`network`** – WebSocket transport and the [`network::ConnectionManager`]
//!   that owns the single live session, its smoothing tick and its reader.
//!
//! - **`discovery`** – mDNS browsing and the /24 health-check sweep, merged
//!   into the device registry.
//!
//! - **`storage`** – TOML config file (platform config directory) and an
//!   in-memory store for tests.

pub mod discovery;
pub mod network;
pub mod storage;
