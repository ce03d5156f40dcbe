//! Integration tests for LAN discovery.
//!
//! The engine is driven through hand-written fakes so timing can be checked on
//! Tokio's paused clock; the HTTP prober is checked against a tiny loopback
//! server.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;

use remotepad_client::application::manage_devices::DeviceRegistry;
use remotepad_client::infrastructure::discovery::{
    AdvertisedHost, DiscoveryConfig, DiscoveryEngine, FixedLocalAddress, HealthProber,
    HttpHealthProber, ServiceBrowser,
};
use remotepad_client::infrastructure::storage::memory::MemoryStore;
use remotepad_core::Device;

/// Browser that returns a fixed list, or never returns when `hang` is set.
struct FakeBrowser {
    hosts: Vec<AdvertisedHost>,
    hang: bool,
}

#[async_trait]
impl ServiceBrowser for FakeBrowser {
    async fn browse(&self, _service_type: &str, _window: Duration) -> Vec<AdvertisedHost> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.hosts.clone()
    }
}

/// Prober that answers for `up`, or never answers at all when `hang` is set.
struct FakeProber {
    up: Vec<&'static str>,
    hang: bool,
}

#[async_trait]
impl HealthProber for FakeProber {
    async fn probe(&self, address: &str, _port: u16, _timeout: Duration) -> bool {
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.up.iter().any(|up| *up == address)
    }
}

fn engine(browser: FakeBrowser, prober: FakeProber) -> DiscoveryEngine {
    DiscoveryEngine::new(
        Arc::new(browser),
        Arc::new(prober),
        Arc::new(FixedLocalAddress(Ipv4Addr::new(192, 168, 1, 5))),
        DiscoveryConfig::default(),
    )
}

fn desk_advert() -> AdvertisedHost {
    AdvertisedHost {
        name: "Desk PC".into(),
        addresses: Vec::new(),
        hostname: "desk.local.".into(),
        port: 1212,
    }
}

#[tokio::test(start_paused = true)]
async fn test_scan_is_bounded_when_nothing_answers() {
    // Arrange
    let engine = engine(
        FakeBrowser {
            hosts: Vec::new(),
            hang: true,
        },
        FakeProber {
            up: Vec::new(),
            hang: true,
        },
    );
    let mut registry = DeviceRegistry::new(Vec::new(), Arc::new(MemoryStore::default()));
    let started = Instant::now();

    // Act
    let found = engine.scan(&mut registry).await.unwrap();

    // Assert: the browse window plus its grace is the longest wait
    assert!(found.is_empty());
    assert!(registry.is_empty());
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_repeated_scans_do_not_duplicate_devices() {
    // Arrange
    let store = Arc::new(MemoryStore::default());
    let mut registry = DeviceRegistry::new(Vec::new(), store.clone());
    let engine = engine(
        FakeBrowser {
            hosts: vec![desk_advert()],
            hang: false,
        },
        FakeProber {
            up: vec!["192.168.1.20", "192.168.1.21"],
            hang: false,
        },
    );

    // Act
    let first = engine.scan(&mut registry).await.unwrap();
    let second = engine.scan(&mut registry).await.unwrap();

    // Assert
    assert_eq!(first, second);
    assert_eq!(registry.len(), 3);
    assert_eq!(store.devices().len(), 3);
    assert_eq!(first[0].address(), "desk.local");
    assert_eq!(first[0].name(), "Desk PC");
}

#[tokio::test]
async fn test_scan_keeps_saved_password_and_name() {
    // Arrange
    let store = Arc::new(MemoryStore::default());
    let mut registry = DeviceRegistry::new(
        vec![Device::new("Office", "192.168.1.20", 1212).with_credential("pw")],
        store.clone(),
    );
    let engine = engine(
        FakeBrowser {
            hosts: Vec::new(),
            hang: false,
        },
        FakeProber {
            up: vec!["192.168.1.20"],
            hang: false,
        },
    );

    // Act
    let found = engine.scan(&mut registry).await.unwrap();

    // Assert
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "Office");
    assert_eq!(found[0].credential(), "pw");
    assert!(found[0].reachable());
    assert_eq!(store.devices()[0].credential(), "pw");
}

#[tokio::test]
async fn test_persist_failure_does_not_fail_the_scan() {
    let mut registry = DeviceRegistry::new(Vec::new(), Arc::new(MemoryStore::failing()));
    let engine = engine(
        FakeBrowser {
            hosts: Vec::new(),
            hang: false,
        },
        FakeProber {
            up: vec!["192.168.1.30"],
            hang: false,
        },
    );

    let found = engine.scan(&mut registry).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "Subnet PC");
}

// ── HTTP health probe ─────────────────────────────────────────────────────────

/// Answers every connection with `status_line` on `/health`, 404 elsewhere.
async fn spawn_health_server(status_line: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let status = if request.starts_with("GET /health ") {
                    status_line
                } else {
                    "404 Not Found"
                };
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    port
}

#[tokio::test]
async fn test_http_probe_accepts_2xx_only() {
    // Arrange
    let healthy = spawn_health_server("200 OK").await;
    let broken = spawn_health_server("500 Internal Server Error").await;
    let prober = HttpHealthProber::new().unwrap();
    let timeout = Duration::from_secs(2);

    // Act
    let up = prober.probe("127.0.0.1", healthy, timeout).await;
    let down = prober.probe("127.0.0.1", broken, timeout).await;

    // Assert
    assert!(up);
    assert!(!down);
}

#[tokio::test]
async fn test_refresh_over_http_marks_reachability() {
    // Arrange
    let healthy = spawn_health_server("200 OK").await;
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut registry = DeviceRegistry::new(
        vec![
            Device::new("Up", "127.0.0.1", healthy),
            Device::new("Down", "127.0.0.1", closed),
        ],
        Arc::new(MemoryStore::default()),
    );
    let engine = DiscoveryEngine::new(
        Arc::new(FakeBrowser {
            hosts: Vec::new(),
            hang: false,
        }),
        Arc::new(HttpHealthProber::new().unwrap()),
        Arc::new(FixedLocalAddress(Ipv4Addr::LOCALHOST)),
        DiscoveryConfig::default(),
    );

    // Act
    let results = engine.refresh_reachability(&mut registry).await;

    // Assert
    assert_eq!(results.len(), 2);
    assert!(registry.list()[0].reachable());
    assert!(!registry.list()[1].reachable());
}
