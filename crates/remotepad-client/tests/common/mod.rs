//! Helpers shared by the integration suites.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use remotepad_client::infrastructure::network::{
    Connector, TransportError, TransportEvent, TransportLink,
};
use remotepad_core::Device;
use serde_json::Value;
use tokio::sync::mpsc;

/// What happened on the links handed out by [`RecordingConnector`].
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Opened(usize),
    Frame(usize, String),
    /// The writer finished: every outbound sender was dropped.
    Closed(usize),
}

/// In-process connector that records link lifecycles and frames in order.
#[derive(Default)]
pub struct RecordingConnector {
    log: Arc<Mutex<Vec<LinkEvent>>>,
    opened: AtomicUsize,
    inbound: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
}

impl RecordingConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self) -> Vec<LinkEvent> {
        self.log.lock().unwrap().clone()
    }

    pub fn lifecycle(&self) -> Vec<LinkEvent> {
        self.log()
            .into_iter()
            .filter(|e| !matches!(e, LinkEvent::Frame(..)))
            .collect()
    }

    /// Frames written on link `n` (1-based), parsed as JSON.
    pub fn frames(&self, n: usize) -> Vec<Value> {
        self.log()
            .into_iter()
            .filter_map(|e| match e {
                LinkEvent::Frame(link, text) if link == n => Some(serde_json::from_str(&text).unwrap()),
                _ => None,
            })
            .collect()
    }

    /// Injects an inbound event on link `n` (1-based).
    pub async fn push(&self, n: usize, event: TransportEvent) {
        let tx = self.inbound.lock().unwrap()[n - 1].clone();
        tx.send(event).await.unwrap();
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn open(&self, _url: &str) -> Result<TransportLink, TransportError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().unwrap().push(LinkEvent::Opened(n));

        let (out_tx, mut out_rx) = mpsc::channel::<String>(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        self.inbound.lock().unwrap().push(in_tx);

        let log = Arc::clone(&self.log);
        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                log.lock().unwrap().push(LinkEvent::Frame(n, frame));
            }
            log.lock().unwrap().push(LinkEvent::Closed(n));
        });

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
            writer,
            // Inbound events come from `push`, so there is no reader task.
            reader: tokio::spawn(async {}),
        })
    }
}

pub fn device(address: &str, credential: &str) -> Device {
    Device::new("Desk PC", address, 1212).with_credential(credential)
}
