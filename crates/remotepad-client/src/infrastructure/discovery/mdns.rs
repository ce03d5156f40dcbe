//! mDNS browsing with `mdns-sd`.
//!
//! The daemon is blocking, so each browse runs on the blocking pool.  The
//! blocking side owns the daemon from start to finish and always stops the
//! browse and shuts the daemon down when the window closes, even if the
//! async caller has already given up.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, trace, warn};

use super::{AdvertisedHost, ServiceBrowser};

#[derive(Debug, Clone, Copy, Default)]
pub struct MdnsBrowser;

#[async_trait]
impl ServiceBrowser for MdnsBrowser {
    async fn browse(&self, service_type: &str, window: Duration) -> Vec<AdvertisedHost> {
        let service_type = service_type.to_string();
        match tokio::task::spawn_blocking(move || browse_blocking(&service_type, window)).await {
            Ok(Ok(hosts)) => hosts,
            Ok(Err(e)) => {
                warn!("mDNS browse failed: {e}");
                Vec::new()
            }
            Err(e) => {
                warn!("mDNS browse task failed: {e}");
                Vec::new()
            }
        }
    }
}

fn browse_blocking(service_type: &str, window: Duration) -> Result<Vec<AdvertisedHost>, mdns_sd::Error> {
    let daemon = ServiceDaemon::new()?;
    let receiver = match daemon.browse(service_type) {
        Ok(receiver) => receiver,
        Err(e) => {
            let _ = daemon.shutdown();
            return Err(e);
        }
    };

    let deadline = Instant::now() + window;
    let mut hosts: Vec<AdvertisedHost> = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match receiver.recv_timeout(remaining) {
            Ok(ServiceEvent::ServiceResolved(info)) => {
                let host = advertised_host(&info, service_type);
                debug!("mDNS resolved '{}' at {:?}", host.name, host.addresses);
                match hosts.iter_mut().find(|h| h.name == host.name) {
                    Some(existing) => *existing = host,
                    None => hosts.push(host),
                }
            }
            Ok(event) => trace!("mDNS event: {event:?}"),
            // Timed out or the daemon went away.
            Err(_) => break,
        }
    }

    if let Err(e) = daemon.stop_browse(service_type) {
        debug!("mDNS stop_browse: {e}");
    }
    if let Err(e) = daemon.shutdown() {
        debug!("mDNS shutdown: {e}");
    }
    Ok(hosts)
}

fn advertised_host(info: &ServiceInfo, service_type: &str) -> AdvertisedHost {
    let mut addresses: Vec<IpAddr> = info.get_addresses().iter().copied().collect();
    // IPv4 sorts before IPv6.
    addresses.sort();
    AdvertisedHost {
        name: instance_name(info.get_fullname(), service_type),
        addresses,
        hostname: info.get_hostname().to_string(),
        port: info.get_port(),
    }
}

/// `Desk PC._remotepad._tcp.local.` becomes `Desk PC`.
fn instance_name(fullname: &str, service_type: &str) -> String {
    fullname
        .strip_suffix(service_type)
        .map(|s| s.trim_end_matches('.'))
        .filter(|s| !s.is_empty())
        .unwrap_or(fullname)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_name_strips_service_type() {
        assert_eq!(
            instance_name("Desk PC._remotepad._tcp.local.", "_remotepad._tcp.local."),
            "Desk PC"
        );
    }

    #[test]
    fn test_instance_name_keeps_unexpected_names() {
        assert_eq!(
            instance_name("odd.name.local.", "_remotepad._tcp.local."),
            "odd.name.local."
        );
    }
}
