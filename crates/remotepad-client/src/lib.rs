//! remotepad-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does remotepad-client do? (for beginners)
//!
//! The client runs on the handheld device.  It:
//!
//! 1. Keeps a list of known hosts and finds new ones on the LAN, both by
//!    browsing mDNS for `_remotepad._tcp` and by probing every address in the
//!    local /24 for the agent's `/health` endpoint.
//! 2. Opens one WebSocket session at a time to the chosen host, stamping
//!    every frame with the host's password.
//! 3. Turns finger motion into cursor and scroll commands, smoothed on a
//!    ~60Hz tick so the host sees a steady stream instead of touch jitter.
//! 4. Sends discrete commands (clicks, keys, media, text, URLs) immediately
//!    and surfaces the host clipboard when it is pushed back.

/// Application layer: use cases for the client.
pub mod application;

/// Infrastructure layer: network session, discovery, and storage.
pub mod infrastructure;
