//! Subnet sweep pieces: the /24 host list, HTTP health probes and the local
//! interface lookup.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;
use remotepad_core::domain::device::health_url;
use tracing::trace;

use super::{DiscoveryError, HealthProber, LocalAddressSource};

/// Every host address (`.1` through `.254`) of the /24 containing `own`.
pub fn subnet_hosts(own: Ipv4Addr) -> Vec<Ipv4Addr> {
    let [a, b, c, _] = own.octets();
    (1..=254).map(|d| Ipv4Addr::new(a, b, c, d)).collect()
}

/// Probes `GET http://<address>:<port>/health`; any 2xx counts as up.
#[derive(Debug, Clone)]
pub struct HttpHealthProber {
    client: reqwest::Client,
}

impl HttpHealthProber {
    pub fn new() -> Result<Self, DiscoveryError> {
        // LAN hosts must never be routed through a proxy.
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProber for HttpHealthProber {
    async fn probe(&self, address: &str, port: u16, timeout: Duration) -> bool {
        let url = health_url(address, port);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => {
                trace!("{url} -> {}", response.status());
                response.status().is_success()
            }
            Err(e) => {
                trace!("{url} failed: {e}");
                false
            }
        }
    }
}

/// Looks up the machine's LAN address through `local-ip-address`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLocalAddress;

impl LocalAddressSource for SystemLocalAddress {
    fn local_ipv4(&self) -> Option<Ipv4Addr> {
        if let Ok(IpAddr::V4(v4)) = local_ip_address::local_ip() {
            if !v4.is_loopback() {
                return Some(v4);
            }
        }
        local_ip_address::list_afinet_netifas()
            .ok()?
            .into_iter()
            .find_map(|(_, ip)| match ip {
                IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
                _ => None,
            })
    }
}

/// A fixed address, for pinning the scanned subnet.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocalAddress(pub Ipv4Addr);

impl LocalAddressSource for FixedLocalAddress {
    fn local_ipv4(&self) -> Option<Ipv4Addr> {
        Some(self.0)
    }
}
