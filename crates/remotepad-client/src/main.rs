//! RemotePad command-line client.
//!
//! A thin driver over the client library: it manages the device list, runs
//! discovery and opens a session long enough to deliver one command.
//!
//! # Usage
//!
//! ```text
//! remotepad [--config PATH] [--log-level LEVEL] <COMMAND>
//!
//! Commands:
//!   devices                       List known devices
//!   add <NAME> <ADDRESS> [--port] Register a device by hand
//!   remove <DEVICE-ID>            Forget a device
//!   scan                          Discover hosts on the LAN
//!   refresh                       Re-probe known devices
//!   settings                      Show tuning settings
//!   set <KEY> <VALUE>             Change one tuning setting
//!   send <DEVICE-ID> [--password] <ACTION>
//! ```
//!
//! | Variable            | Description                          |
//! |---------------------|--------------------------------------|
//! | `REMOTEPAD_CONFIG`  | Config file path (same as `--config`) |
//! | `RUST_LOG`          | Overrides the log filter entirely    |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use remotepad_client::application::connect_device::connect_known_device;
use remotepad_client::application::manage_devices::DeviceRegistry;
use remotepad_client::application::tune_settings::SettingsController;
use remotepad_client::application::type_text::{chord, TypedText};
use remotepad_client::infrastructure::discovery::DiscoveryEngine;
use remotepad_client::infrastructure::network::{ConnectionManager, WsConnector};
use remotepad_client::infrastructure::storage::config::{
    config_file_path, load_config_from, AppConfig, TomlPreferenceStore,
};
use remotepad_core::protocol::DEFAULT_HOST_PORT;
use remotepad_core::{Command, Device, DeviceId, MediaAction, MouseButton, SettingKey, SystemAction};

/// How long `clipboard-get` waits for the host's answer.
const CLIPBOARD_WAIT: Duration = Duration::from_secs(3);

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "remotepad",
    about = "Control a computer on your LAN from the command line",
    version
)]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "REMOTEPAD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when `RUST_LOG` is unset (defaults to the config's).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// List known devices.
    Devices,
    /// Register a device by address.
    Add {
        name: String,
        address: String,
        #[arg(long, default_value_t = DEFAULT_HOST_PORT)]
        port: u16,
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget a device.
    Remove { id: String },
    /// Browse mDNS and sweep the local /24 for hosts.
    Scan,
    /// Re-probe the health endpoint of every known device.
    Refresh,
    /// Show the tuning settings.
    Settings,
    /// Change and save one tuning setting.
    Set { key: KeyArg, value: f64 },
    /// Connect to a device and send one action.
    Send {
        id: String,
        /// Saved for next time when given.
        #[arg(long)]
        password: Option<String>,
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Type text on the host.
    Type { text: String },
    /// Press and release a key, optionally while holding a modifier.
    Tap {
        key: String,
        #[arg(long)]
        with: Option<String>,
    },
    Click {
        #[arg(value_enum, default_value_t = ButtonArg::Left)]
        button: ButtonArg,
    },
    /// audio_prev, audio_play_pause, audio_next, audio_vol_down, audio_mute, audio_vol_up
    Media { action: MediaAction },
    /// shutdown, restart, lock, sleep
    System { action: SystemAction },
    OpenUrl { url: String },
    ClipboardSet { text: String },
    /// Ask the host for its clipboard and print it.
    ClipboardGet,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ButtonArg {
    Left,
    Right,
}

impl From<ButtonArg> for MouseButton {
    fn from(button: ButtonArg) -> Self {
        match button {
            ButtonArg::Left => MouseButton::Left,
            ButtonArg::Right => MouseButton::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyArg {
    MoveSensitivity,
    ScrollSensitivity,
    SmoothingFactor,
    Deadzone,
}

impl From<KeyArg> for SettingKey {
    fn from(key: KeyArg) -> Self {
        match key {
            KeyArg::MoveSensitivity => SettingKey::MoveSensitivity,
            KeyArg::ScrollSensitivity => SettingKey::ScrollSensitivity,
            KeyArg::SmoothingFactor => SettingKey::SmoothingFactor,
            KeyArg::Deadzone => SettingKey::Deadzone,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config_file_path().context("cannot locate the config directory")?,
    };
    let config = load_config_from(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.client.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    info!("using config {}", config_path.display());
    let store = Arc::new(TomlPreferenceStore::new(config_path));
    let (mut registry, settings) =
        DeviceRegistry::load(store.clone()).context("failed to read saved devices")?;

    match cli.command {
        CliCommand::Devices => print_devices(registry.list()),

        CliCommand::Add {
            name,
            address,
            port,
            password,
        } => {
            let device = Device::new(name, address, port).with_credential(password.unwrap_or_default());
            let id = device.id();
            registry.add(device).context("failed to add device")?;
            println!("added {id}");
        }

        CliCommand::Remove { id } => {
            let removed = registry
                .remove(&DeviceId::from(id))
                .context("failed to remove device")?;
            println!("removed {} ({})", removed.name(), removed.id());
        }

        CliCommand::Scan => {
            let engine = DiscoveryEngine::system(config.discovery_config())?;
            let found = engine.scan(&mut registry).await?;
            if found.is_empty() {
                println!("no hosts found");
            } else {
                print_devices(&found);
            }
        }

        CliCommand::Refresh => {
            let engine = DiscoveryEngine::system(config.discovery_config())?;
            engine.refresh_reachability(&mut registry).await;
            print_devices(registry.list());
        }

        CliCommand::Settings => {
            for key in SettingKey::ALL {
                println!("{:<20} {}", key.as_str(), settings.get(key));
            }
        }

        CliCommand::Set { key, value } => {
            let controller = SettingsController::new(settings, store);
            controller
                .commit(key.into(), value)
                .context("failed to change setting")?;
            println!("{} = {value}", SettingKey::from(key));
        }

        CliCommand::Send {
            id,
            password,
            action,
        } => {
            send_action(&config, &mut registry, settings, DeviceId::from(id), password, action).await?;
        }
    }

    Ok(())
}

async fn send_action(
    config: &AppConfig,
    registry: &mut DeviceRegistry,
    settings: remotepad_core::Settings,
    id: DeviceId,
    password: Option<String>,
    action: Action,
) -> anyhow::Result<()> {
    let (_settings_tx, settings_rx) = tokio::sync::watch::channel(settings);
    let manager = ConnectionManager::new(
        Arc::new(WsConnector::default()),
        config.session_config(),
        settings_rx,
    );
    let mut clipboard = manager.subscribe_clipboard();

    connect_known_device(registry, &manager, &id, password)
        .await
        .with_context(|| format!("cannot connect to {id}"))?;

    let commands = match &action {
        Action::Type { text } => TypedText::new().update(text).commands,
        Action::Tap { key, with: Some(modifier) } => chord(modifier, key),
        Action::Tap { key, with: None } => vec![Command::tap(key)],
        Action::Click { button } => vec![Command::Click {
            button: (*button).into(),
        }],
        Action::Media { action } => vec![Command::media(*action)],
        Action::System { action } => vec![Command::system(*action)],
        Action::OpenUrl { url } => vec![Command::OpenUrl { value: url.clone() }],
        Action::ClipboardSet { text } => vec![Command::ClipboardSet { value: text.clone() }],
        Action::ClipboardGet => vec![Command::ClipboardGet],
    };

    let mut delivered = true;
    for command in &commands {
        delivered &= manager.send(command);
    }

    if matches!(action, Action::ClipboardGet) && delivered {
        match tokio::time::timeout(CLIPBOARD_WAIT, clipboard.recv()).await {
            Ok(Ok(value)) => println!("{value}"),
            Ok(Err(e)) => warn!("clipboard channel closed: {e}"),
            Err(_) => warn!("host did not answer within {CLIPBOARD_WAIT:?}"),
        }
    }

    // Flushes the queued frames before the socket closes.
    manager.disconnect().await;
    if !delivered {
        bail!("session to {id} closed before every command was sent");
    }
    Ok(())
}

fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("no devices");
        return;
    }
    for device in devices {
        println!(
            "{:<24} {:<28} {:<8} {}",
            device.id(),
            device.name(),
            if device.reachable() { "online" } else { "offline" },
            if device.has_credential() { "password saved" } else { "" },
        );
    }
}
