//! LAN discovery of host agents.
//!
//! Two strategies run side by side and are merged:
//!
//! 1. **mDNS browse** for `_remotepad._tcp.local.` during a fixed window.
//! 2. **Subnet sweep**: a `GET /health` to every address of the local /24,
//!    all at once, each with its own timeout.
//!
//! Both are bounded in time, and individual failures only mean "not found".
//! The only error a scan reports is [`DiscoveryError::NoNetwork`], when there
//! is no IPv4 interface to derive a subnet from.
//!
//! The concrete browser, prober and interface lookup sit behind traits so the
//! engine can be tested without a network.

pub mod mdns;
pub mod subnet;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use remotepad_core::protocol::{DEFAULT_HOST_PORT, SERVICE_TYPE};
use remotepad_core::{Device, DeviceId};
use thiserror::Error;
use tokio::time;
use tracing::{debug, info, warn};

use crate::application::manage_devices::DeviceRegistry;

pub use mdns::MdnsBrowser;
pub use subnet::{subnet_hosts, FixedLocalAddress, HttpHealthProber, SystemLocalAddress};

/// Name given to hosts found only by the subnet sweep.
pub const SUBNET_DEVICE_NAME: &str = "Subnet PC";

/// Extra time allowed on top of the browse window before giving up on it.
const BROWSE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no IPv4 network interface available")]
    NoNetwork,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// Port probed on every subnet address.
    pub port: u16,
    pub service_type: String,
    pub browse_window: Duration,
    /// Per-address timeout during a scan.
    pub probe_timeout: Duration,
    /// Per-device timeout during a reachability refresh.
    pub refresh_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HOST_PORT,
            service_type: SERVICE_TYPE.to_string(),
            browse_window: Duration::from_secs(2),
            probe_timeout: Duration::from_millis(1200),
            refresh_timeout: Duration::from_secs(1),
        }
    }
}

/// A resolved mDNS advertisement.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisedHost {
    pub name: String,
    pub addresses: Vec<IpAddr>,
    /// Target hostname, e.g. `desk.local.`.
    pub hostname: String,
    pub port: u16,
}

impl AdvertisedHost {
    /// First IPv4 address, else the hostname without its trailing dot.
    pub fn preferred_address(&self) -> Option<String> {
        if let Some(v4) = self.addresses.iter().find(|a| a.is_ipv4()) {
            return Some(v4.to_string());
        }
        let host = self.hostname.trim_end_matches('.');
        (!host.is_empty()).then(|| host.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceBrowser: Send + Sync {
    /// Collects advertisements of `service_type` for `window`, then stops.
    async fn browse(&self, service_type: &str, window: Duration) -> Vec<AdvertisedHost>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthProber: Send + Sync {
    /// Returns whether `GET /health` on the endpoint answered 2xx in time.
    async fn probe(&self, address: &str, port: u16, timeout: Duration) -> bool;
}

#[cfg_attr(test, mockall::automock)]
pub trait LocalAddressSource: Send + Sync {
    fn local_ipv4(&self) -> Option<Ipv4Addr>;
}

pub struct DiscoveryEngine {
    browser: Arc<dyn ServiceBrowser>,
    prober: Arc<dyn HealthProber>,
    local: Arc<dyn LocalAddressSource>,
    config: DiscoveryConfig,
}

impl DiscoveryEngine {
    pub fn new(
        browser: Arc<dyn ServiceBrowser>,
        prober: Arc<dyn HealthProber>,
        local: Arc<dyn LocalAddressSource>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            browser,
            prober,
            local,
            config,
        }
    }

    /// Engine wired to mDNS, HTTP health checks and the system interfaces.
    pub fn system(config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        Ok(Self::new(
            Arc::new(MdnsBrowser),
            Arc::new(HttpHealthProber::new()?),
            Arc::new(SystemLocalAddress),
            config,
        ))
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Finds hosts, merges them into `registry` and returns them as stored
    /// there (known hosts keep their credential).
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::NoNetwork`] if no local IPv4 address is available.
    pub async fn scan(&self, registry: &mut DeviceRegistry) -> Result<Vec<Device>, DiscoveryError> {
        let own = self.local.local_ipv4().ok_or(DiscoveryError::NoNetwork)?;
        let hosts = subnet_hosts(own);
        info!("scanning {}/24 and browsing {}", own, self.config.service_type);

        let (advertised, probed) = tokio::join!(self.browse(), self.sweep(&hosts));
        debug!(
            "mDNS returned {} host(s), subnet sweep {} host(s)",
            advertised.len(),
            probed.len()
        );

        let mut found = Vec::with_capacity(advertised.len() + probed.len());
        for host in advertised {
            match host.preferred_address() {
                Some(address) => found.push(Device::new(host.name, address, host.port)),
                None => debug!("ignoring advertisement '{}' without an address", host.name),
            }
        }
        for ip in probed {
            found.push(Device::new(SUBNET_DEVICE_NAME, ip.to_string(), self.config.port));
        }

        let mut ids: Vec<DeviceId> = Vec::new();
        for device in &found {
            let id = device.id();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        match registry.merge_discovered(found) {
            Ok(summary) => info!(
                "discovery found {} host(s): {} new, {} known",
                ids.len(),
                summary.added,
                summary.refreshed
            ),
            Err(e) => warn!("could not persist discovery results: {e}"),
        }

        Ok(ids
            .iter()
            .filter_map(|id| registry.get(id).cloned())
            .collect())
    }

    /// Re-probes every known device's health endpoint and records the result.
    pub async fn refresh_reachability(&self, registry: &mut DeviceRegistry) -> Vec<(DeviceId, bool)> {
        let timeout = self.config.refresh_timeout;
        let probes = registry.list().iter().map(|device| {
            let id = device.id();
            let address = device.address().to_string();
            let port = device.port();
            async move {
                let up = self.probe_bounded(&address, port, timeout).await;
                (id, up)
            }
        });
        let results = join_all(probes).await;

        let online = results.iter().filter(|(_, up)| *up).count();
        info!("{online}/{} known device(s) reachable", results.len());
        if let Err(e) = registry.apply_reachability(&results) {
            warn!("could not persist reachability: {e}");
        }
        results
    }

    async fn browse(&self) -> Vec<AdvertisedHost> {
        let window = self.config.browse_window;
        match time::timeout(
            window + BROWSE_GRACE,
            self.browser.browse(&self.config.service_type, window),
        )
        .await
        {
            Ok(hosts) => hosts,
            Err(_) => {
                warn!("mDNS browse overran its window; ignoring it");
                Vec::new()
            }
        }
    }

    async fn sweep(&self, hosts: &[Ipv4Addr]) -> Vec<Ipv4Addr> {
        let port = self.config.port;
        let timeout = self.config.probe_timeout;
        let probes = hosts.iter().map(|ip| async move {
            let address = ip.to_string();
            self.probe_bounded(&address, port, timeout)
                .await
                .then_some(*ip)
        });
        join_all(probes).await.into_iter().flatten().collect()
    }

    // The prober is given the timeout too, but the engine does not rely on it.
    async fn probe_bounded(&self, address: &str, port: u16, timeout: Duration) -> bool {
        time::timeout(timeout, self.prober.probe(address, port, timeout))
            .await
            .unwrap_or(false)
    }
}
