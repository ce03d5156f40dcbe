//! ConnectionManager: owns the single live session to a host.
//!
//! # State machine
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open──▶ Open ──close──▶ Closed
//!                        │                 │
//!                        └──error──▶ Failed ◀──error──┘
//! ```
//!
//! At most one session is live.  `connect` tears the previous one down and
//! waits for its writer to finish before opening the next, so two sockets
//! never coexist.  Each session gets a generation number; events from a
//! superseded session's tasks are ignored.
//!
//! # Tasks per session
//!
//! - **writer** and **reader** (spawned by the transport) move frames on and
//!   off the socket.  Teardown waits up to `close_timeout` for the writer,
//!   then aborts both.
//! - **ticker** drains the motion mailbox every tick through a fresh
//!   [`InputSmoother`] and queues the resulting `move`/`scroll` frames.
//! - **pump** reads inbound events: clipboard pushes are broadcast, decode
//!   failures are logged and dropped, close/error end the session.
//!
//! `connect` may be dropped at any await point.  An abandoned attempt leaves
//! the state `Failed`, never stuck in `Connecting`.
//!
//! Nothing is queued while the session is not open.  [`ConnectionManager::send`]
//! and [`ConnectionManager::submit`] drop their input in that case.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use remotepad_core::{
    decode_inbound, encode_command, Command, Device, HostMessage, ProtocolError, Settings,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::capture_gesture::{Intent, IntentSink, Motion};
use crate::application::connect_device::SessionControl;
use crate::application::smooth_input::{InputSmoother, TrailingPolicy};
use crate::infrastructure::network::transport::{
    Connector, TransportError, TransportEvent, TransportLink,
};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Failed,
}

/// Snapshot published to status subscribers on every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub device: Option<Device>,
    pub last_error: Option<String>,
}

impl SessionStatus {
    fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            device: None,
            last_error: None,
        }
    }
}

/// Tunables for the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Smoothing tick period.
    pub tick_interval: Duration,
    /// Upper bound on opening the transport.
    pub connect_timeout: Duration,
    /// How long teardown waits for the old writer to finish.
    pub close_timeout: Duration,
    /// Capacity of the motion mailbox between gesture capture and the ticker.
    pub mailbox_capacity: usize,
    pub trailing: TrailingPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            connect_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(1),
            mailbox_capacity: 256,
            trailing: TrailingPolicy::StopOnRelease,
        }
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

struct LiveSession {
    generation: u64,
    token: String,
    outbound: mpsc::Sender<String>,
    motion: mpsc::Sender<Motion>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
    ticker: JoinHandle<()>,
    pump: JoinHandle<()>,
}

impl LiveSession {
    /// Stops every task without waiting.  Used where there is no runtime
    /// context to await in.
    fn abort_all(&self) {
        self.ticker.abort();
        self.pump.abort();
        self.reader.abort();
        self.writer.abort();
    }
}

struct Inner {
    generation: u64,
    state: SessionState,
    live: Option<LiveSession>,
    last_device: Option<Device>,
    last_credential: Option<String>,
}

struct Shared {
    inner: Mutex<Inner>,
    status: watch::Sender<SessionStatus>,
    clipboard: broadcast::Sender<String>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the state and publishes it.  Called with the lock held so
    /// subscribers see transitions in the order they happened.
    fn transition(&self, inner: &mut Inner, state: SessionState, last_error: Option<String>) {
        inner.state = state;
        self.status.send_replace(SessionStatus {
            state,
            device: inner.last_device.clone(),
            last_error,
        });
    }

    /// Moves the session of `generation` into `state` and detaches it.
    /// Returns `None` if that session has already been superseded.
    fn end(
        &self,
        generation: u64,
        state: SessionState,
        error: Option<String>,
    ) -> Option<Option<LiveSession>> {
        let mut inner = self.lock();
        if inner.generation != generation {
            return None;
        }
        self.transition(&mut inner, state, error);
        let owned = inner
            .live
            .as_ref()
            .map_or(false, |l| l.generation == generation);
        Some(if owned { inner.live.take() } else { None })
    }
}

// ── ConnectionManager ─────────────────────────────────────────────────────────

/// Owns the one live host session.  See the module docs.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    config: SessionConfig,
    settings: watch::Receiver<Settings>,
    // Serializes connect/disconnect so teardown-then-open is atomic.
    connect_lock: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        config: SessionConfig,
        settings: watch::Receiver<Settings>,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::idle());
        let (clipboard, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    state: SessionState::Idle,
                    live: None,
                    last_device: None,
                    last_credential: None,
                }),
                status,
                clipboard,
            }),
            connector,
            config,
            settings,
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// Host clipboard contents, as pushed by the host.
    pub fn subscribe_clipboard(&self) -> broadcast::Receiver<String> {
        self.shared.clipboard.subscribe()
    }

    /// Opens a session to `device`, replacing any live session.
    ///
    /// The token stamped on every frame is `credential` when it is non-empty,
    /// else the device's stored credential.  Checking that one exists is the
    /// caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the link cannot be opened within the
    /// connect timeout; the state is then `Failed`.
    pub async fn connect(&self, device: Device, credential: Option<String>) -> Result<(), TransportError> {
        let _guard = self.connect_lock.lock().await;

        let token = credential
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| device.credential().to_string());

        let (generation, previous) = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.last_device = Some(device.clone());
            inner.last_credential = Some(token.clone());
            self.shared
                .transition(&mut inner, SessionState::Connecting, None);
            (inner.generation, inner.live.take())
        };
        let _attempt = PendingConnect {
            shared: &self.shared,
            generation,
        };
        if let Some(previous) = previous {
            debug!("closing previous session before connecting");
            self.teardown(previous).await;
        }

        let url = device.ws_url();
        info!("connecting to {} at {url}", device.name());
        let link = match time::timeout(self.config.connect_timeout, self.connector.open(&url)).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => return Err(self.fail(generation, e)),
            Err(_) => {
                let e = TransportError::Timeout {
                    url,
                    timeout: self.config.connect_timeout,
                };
                return Err(self.fail(generation, e));
            }
        };

        let live = self.start_session(generation, token, link);
        let rejected = {
            let mut inner = self.shared.lock();
            if inner.generation == generation && inner.state == SessionState::Connecting {
                inner.live = Some(live);
                self.shared.transition(&mut inner, SessionState::Open, None);
                None
            } else {
                Some(live)
            }
        };
        if let Some(live) = rejected {
            // The host hung up before the session was published.
            self.teardown(live).await;
            return Err(TransportError::Lost(format!(
                "{} closed the connection while it was opening",
                device.id()
            )));
        }
        info!("session open to {}", device.id());
        Ok(())
    }

    /// Reconnects to the last device if no session is connecting or open.
    ///
    /// Returns `Ok(false)` when there was nothing to do.
    pub async fn reconnect(&self) -> Result<bool, TransportError> {
        let target = {
            let inner = self.shared.lock();
            match inner.state {
                SessionState::Connecting | SessionState::Open => None,
                _ => inner
                    .last_device
                    .clone()
                    .map(|d| (d, inner.last_credential.clone())),
            }
        };
        match target {
            Some((device, credential)) => {
                info!("reconnecting to {}", device.id());
                self.connect(device, credential).await.map(|()| true)
            }
            None => Ok(false),
        }
    }

    /// Closes the live session, if any.  Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let _guard = self.connect_lock.lock().await;
        let live = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            if matches!(inner.state, SessionState::Connecting | SessionState::Open) {
                info!("session closed by client");
                self.shared.transition(&mut inner, SessionState::Closed, None);
            }
            inner.live.take()
        };
        if let Some(live) = live {
            self.teardown(live).await;
        }
    }

    /// Sends a discrete command immediately.
    ///
    /// Returns whether the frame was queued.  Nothing is queued unless the
    /// session is open.
    pub fn send(&self, command: &Command) -> bool {
        let inner = self.shared.lock();
        let live = match (&inner.state, inner.live.as_ref()) {
            (SessionState::Open, Some(live)) => live,
            _ => {
                debug!("dropping '{}' while not connected", command.kind());
                return false;
            }
        };
        transmit(&live.outbound, &live.token, command)
    }

    /// Routes a recognised intent: motion to the smoothing mailbox, commands
    /// straight to [`ConnectionManager::send`].
    pub fn submit(&self, intent: Intent) {
        match intent {
            Intent::Command(command) => {
                self.send(&command);
            }
            Intent::Motion(motion) => {
                let inner = self.shared.lock();
                if let (SessionState::Open, Some(live)) = (&inner.state, inner.live.as_ref()) {
                    if live.motion.try_send(motion).is_err() {
                        debug!("motion mailbox full, dropping delta");
                    }
                }
            }
        }
    }

    fn fail(&self, generation: u64, error: TransportError) -> TransportError {
        warn!("connect failed: {error}");
        self.shared
            .end(generation, SessionState::Failed, Some(error.to_string()));
        error
    }

    fn start_session(&self, generation: u64, token: String, link: TransportLink) -> LiveSession {
        let TransportLink {
            outbound,
            inbound,
            writer,
            reader,
        } = link;
        let (motion_tx, motion_rx) = mpsc::channel(self.config.mailbox_capacity.max(1));

        let ticker = tokio::spawn(run_ticker(
            outbound.clone(),
            token.clone(),
            motion_rx,
            self.settings.clone(),
            self.config.tick_interval,
            self.config.trailing,
        ));
        let pump = tokio::spawn(run_pump(Arc::clone(&self.shared), generation, inbound));

        LiveSession {
            generation,
            token,
            outbound,
            motion: motion_tx,
            writer,
            reader,
            ticker,
            pump,
        }
    }

    async fn teardown(&self, live: LiveSession) {
        let LiveSession {
            outbound,
            motion,
            mut writer,
            reader,
            ticker,
            pump,
            ..
        } = live;
        ticker.abort();
        pump.abort();
        // Wait for the aborted tasks so their outbound clones are dropped.
        reap("ticker", ticker.await);
        reap("pump", pump.await);
        drop(motion);
        drop(outbound);
        match time::timeout(self.config.close_timeout, &mut writer).await {
            Ok(result) => reap("writer", result),
            Err(_) => {
                warn!(
                    "previous connection did not close within {:?}; aborting it",
                    self.config.close_timeout
                );
                writer.abort();
                reap("writer", writer.await);
            }
        }
        reader.abort();
        reap("reader", reader.await);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(live) = self.shared.lock().live.take() {
            live.abort_all();
        }
    }
}

/// Logs a session task that ended in a panic.  Cancellation is expected.
fn reap(task: &str, result: Result<(), JoinError>) {
    if let Err(e) = result {
        if !e.is_cancelled() {
            warn!("session {task} task failed: {e}");
        }
    }
}

/// Armed for the lifetime of one `connect` call.  If the call is dropped
/// while its attempt is still `Connecting`, the attempt is marked `Failed`.
struct PendingConnect<'a> {
    shared: &'a Shared,
    generation: u64,
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if inner.generation != self.generation || inner.state != SessionState::Connecting {
            return;
        }
        warn!("connect abandoned before the session opened");
        self.shared.transition(
            &mut inner,
            SessionState::Failed,
            Some("connect cancelled".to_string()),
        );
        if let Some(live) = inner.live.take() {
            live.abort_all();
        }
    }
}

impl IntentSink for ConnectionManager {
    fn submit(&self, intent: Intent) {
        ConnectionManager::submit(self, intent);
    }
}

#[async_trait]
impl SessionControl for ConnectionManager {
    async fn open_session(&self, device: Device, credential: Option<String>) -> Result<(), String> {
        self.connect(device, credential).await.map_err(|e| e.to_string())
    }

    async fn resume_session(&self) -> Result<bool, String> {
        self.reconnect().await.map_err(|e| e.to_string())
    }
}

// ── Session tasks ─────────────────────────────────────────────────────────────

fn transmit(outbound: &mpsc::Sender<String>, token: &str, command: &Command) -> bool {
    let frame = match encode_command(command, token) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("{e}");
            return false;
        }
    };
    match outbound.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("outbound queue full, dropping '{}'", command.kind());
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

async fn run_ticker(
    outbound: mpsc::Sender<String>,
    token: String,
    mut motion: mpsc::Receiver<Motion>,
    mut settings: watch::Receiver<Settings>,
    period: Duration,
    trailing: TrailingPolicy,
) {
    let mut smoother = InputSmoother::new(*settings.borrow_and_update(), trailing);
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        if settings.has_changed().unwrap_or(false) {
            smoother.set_settings(*settings.borrow_and_update());
        }
        loop {
            match motion.try_recv() {
                Ok(m) => smoother.push(m),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return,
            }
        }
        for command in smoother.tick() {
            transmit(&outbound, &token, &command);
        }
    }
}

async fn run_pump(shared: Arc<Shared>, generation: u64, mut inbound: mpsc::Receiver<TransportEvent>) {
    let (state, error) = loop {
        match inbound.recv().await {
            Some(TransportEvent::Text(text)) => match decode_inbound(&text) {
                Ok(HostMessage::Clipboard { value }) => {
                    debug!("host clipboard received ({} chars)", value.chars().count());
                    let _ = shared.clipboard.send(value);
                }
                Err(e) => warn!("dropping inbound frame: {e}"),
            },
            Some(TransportEvent::Binary(len)) => {
                warn!("dropping inbound frame: {}", ProtocolError::UnexpectedBinary(len));
            }
            Some(TransportEvent::Closed) | None => break (SessionState::Closed, None),
            Some(TransportEvent::Error(e)) => {
                break (SessionState::Failed, Some(TransportError::Lost(e).to_string()))
            }
        }
    };

    if let Some(live) = shared.end(generation, state, error.clone()).flatten() {
        // The ticker holds an outbound clone; stopping it lets the writer finish.
        live.ticker.abort();
        live.reader.abort();
    }
    match error {
        Some(e) => warn!("session failed: {e}"),
        None => info!("session closed by host"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remotepad_core::MouseButton;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Connector whose links are plain channels held by the test.
    #[derive(Default)]
    struct ChannelConnector {
        links: StdMutex<Vec<(mpsc::Receiver<String>, mpsc::Sender<TransportEvent>)>>,
        refuse: bool,
        /// The first open never completes.
        stall_first: bool,
        opens: AtomicUsize,
    }

    #[async_trait]
    impl Connector for ChannelConnector {
        async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
            if self.opens.fetch_add(1, Ordering::SeqCst) == 0 && self.stall_first {
                std::future::pending::<()>().await;
            }
            if self.refuse {
                return Err(TransportError::Connect {
                    url: url.to_string(),
                    reason: "refused".to_string(),
                });
            }
            let (out_tx, out_rx) = mpsc::channel(64);
            let (in_tx, in_rx) = mpsc::channel(64);
            self.links.lock().unwrap().push((out_rx, in_tx));
            Ok(TransportLink {
                outbound: out_tx,
                inbound: in_rx,
                writer: tokio::spawn(async {}),
                reader: tokio::spawn(async {}),
            })
        }
    }

    /// Sets its flag when dropped, i.e. when the task owning it is gone.
    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Connector whose writer and reader tasks never finish on their own.
    #[derive(Default)]
    struct StuckConnector {
        /// (writer gone, reader gone) per opened link.
        gone: StdMutex<Vec<(Arc<AtomicBool>, Arc<AtomicBool>)>>,
    }

    #[async_trait]
    impl Connector for StuckConnector {
        async fn open(&self, _url: &str) -> Result<TransportLink, TransportError> {
            let (out_tx, out_rx) = mpsc::channel::<String>(64);
            let (in_tx, in_rx) = mpsc::channel(64);
            let writer_gone = Arc::new(AtomicBool::new(false));
            let reader_gone = Arc::new(AtomicBool::new(false));
            self.gone
                .lock()
                .unwrap()
                .push((writer_gone.clone(), reader_gone.clone()));

            // Ignores the closed queue, like a socket stuck mid-close.
            let writer_flag = SetOnDrop(writer_gone);
            let writer = tokio::spawn(async move {
                let _flag = writer_flag;
                let _queue = out_rx;
                std::future::pending::<()>().await;
            });
            let reader_flag = SetOnDrop(reader_gone);
            let reader = tokio::spawn(async move {
                let _flag = reader_flag;
                let _events = in_tx;
                std::future::pending::<()>().await;
            });
            Ok(TransportLink {
                outbound: out_tx,
                inbound: in_rx,
                writer,
                reader,
            })
        }
    }

    fn manager(connector: Arc<ChannelConnector>) -> ConnectionManager {
        let (_tx, rx) = watch::channel(Settings::default());
        ConnectionManager::new(connector, SessionConfig::default(), rx)
    }

    fn device() -> Device {
        Device::new("Desk PC", "10.0.0.5", 1212).with_credential("x")
    }

    #[tokio::test]
    async fn test_new_manager_is_idle_and_drops_sends() {
        let mgr = manager(Arc::new(ChannelConnector::default()));
        assert_eq!(mgr.state(), SessionState::Idle);
        assert!(!mgr.send(&Command::ClipboardGet));
    }

    #[tokio::test]
    async fn test_connect_opens_and_stamps_token() {
        // Arrange
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector.clone());

        // Act
        mgr.connect(device(), None).await.unwrap();
        let queued = mgr.send(&Command::Click {
            button: MouseButton::Left,
        });

        // Assert
        assert_eq!(mgr.state(), SessionState::Open);
        assert!(queued);
        let frame = connector.links.lock().unwrap()[0].0.try_recv().unwrap();
        assert_eq!(frame, r#"{"type":"click","button":"left","token":"x"}"#);
    }

    #[tokio::test]
    async fn test_override_credential_wins() {
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector.clone());

        mgr.connect(device(), Some("fresh".into())).await.unwrap();
        mgr.send(&Command::ClipboardGet);

        let frame = connector.links.lock().unwrap()[0].0.try_recv().unwrap();
        assert!(frame.ends_with(r#""token":"fresh"}"#), "{frame}");
    }

    #[tokio::test]
    async fn test_refused_connect_is_failed_and_reported() {
        // Arrange
        let connector = Arc::new(ChannelConnector {
            refuse: true,
            ..Default::default()
        });
        let mgr = manager(connector);
        let status = mgr.subscribe_status();

        // Act
        let result = mgr.connect(device(), None).await;

        // Assert
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        assert_eq!(mgr.state(), SessionState::Failed);
        assert!(status.borrow().last_error.is_some());
        assert!(!mgr.send(&Command::ClipboardGet));
    }

    #[tokio::test]
    async fn test_host_close_moves_to_closed() {
        // Arrange
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector.clone());
        mgr.connect(device(), None).await.unwrap();
        let mut status = mgr.subscribe_status();

        // Act
        let events = connector.links.lock().unwrap()[0].1.clone();
        events.send(TransportEvent::Closed).await.unwrap();
        status
            .wait_for(|s| s.state == SessionState::Closed)
            .await
            .unwrap();

        // Assert
        assert!(!mgr.send(&Command::ClipboardGet));
    }

    #[tokio::test]
    async fn test_transport_error_moves_to_failed_with_detail() {
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector.clone());
        mgr.connect(device(), None).await.unwrap();
        let mut status = mgr.subscribe_status();

        let events = connector.links.lock().unwrap()[0].1.clone();
        events.send(TransportEvent::Error("reset".into())).await.unwrap();
        let failed = status
            .wait_for(|s| s.state == SessionState::Failed)
            .await
            .unwrap()
            .clone();

        assert!(failed.last_error.unwrap().contains("reset"));
    }

    #[tokio::test]
    async fn test_clipboard_push_is_broadcast_and_garbage_is_ignored() {
        // Arrange
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector.clone());
        let mut clipboard = mgr.subscribe_clipboard();
        mgr.connect(device(), None).await.unwrap();
        let events = connector.links.lock().unwrap()[0].1.clone();

        // Act
        events.send(TransportEvent::Text("{not json".into())).await.unwrap();
        events.send(TransportEvent::Binary(4)).await.unwrap();
        events
            .send(TransportEvent::Text(r#"{"type":"clipboard","value":"hi"}"#.into()))
            .await
            .unwrap();

        // Assert
        assert_eq!(clipboard.recv().await.unwrap(), "hi");
        assert_eq!(mgr.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector);
        mgr.connect(device(), None).await.unwrap();

        mgr.disconnect().await;
        mgr.disconnect().await;

        assert_eq!(mgr.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_reconnect_is_noop_without_history_or_when_open() {
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector.clone());

        assert!(!mgr.reconnect().await.unwrap());
        mgr.connect(device(), None).await.unwrap();
        assert!(!mgr.reconnect().await.unwrap());
        assert_eq!(connector.links.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_after_close_reuses_last_device_and_token() {
        // Arrange
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector.clone());
        mgr.connect(device(), Some("override".into())).await.unwrap();
        mgr.disconnect().await;

        // Act
        let attempted = mgr.reconnect().await.unwrap();
        mgr.send(&Command::ClipboardGet);

        // Assert
        assert!(attempted);
        assert_eq!(mgr.state(), SessionState::Open);
        let frame = connector.links.lock().unwrap()[1].0.try_recv().unwrap();
        assert!(frame.contains(r#""token":"override""#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_is_smoothed_on_tick() {
        // Arrange: pass-through settings
        let connector = Arc::new(ChannelConnector::default());
        let (_tx, rx) = watch::channel(Settings {
            move_sensitivity: 1.0,
            scroll_sensitivity: 1.0,
            smoothing_factor: 0.0,
            deadzone: 0.0,
        });
        let mgr = ConnectionManager::new(connector.clone(), SessionConfig::default(), rx);
        mgr.connect(device(), None).await.unwrap();

        // Act
        mgr.submit(Intent::Motion(Motion::Move { dx: 3.0, dy: 4.0 }));
        time::sleep(Duration::from_millis(40)).await;

        // Assert
        let frame = connector.links.lock().unwrap()[0].0.try_recv().unwrap();
        assert_eq!(frame, r#"{"type":"move","x":3.0,"y":4.0,"token":"x"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_session_aborts_writer_stuck_in_close() {
        // Arrange
        let connector = Arc::new(StuckConnector::default());
        let config = SessionConfig {
            close_timeout: Duration::from_millis(50),
            ..SessionConfig::default()
        };
        let (_tx, rx) = watch::channel(Settings::default());
        let mgr = ConnectionManager::new(connector.clone(), config, rx);
        mgr.connect(device(), None).await.unwrap();

        // Act
        mgr.connect(device(), None).await.unwrap();

        // Assert: the first link's tasks are gone, the second one's are live
        assert_eq!(mgr.state(), SessionState::Open);
        let gone = connector.gone.lock().unwrap();
        assert_eq!(gone.len(), 2);
        assert!(gone[0].0.load(Ordering::SeqCst), "old writer still running");
        assert!(gone[0].1.load(Ordering::SeqCst), "old reader still running");
        assert!(!gone[1].0.load(Ordering::SeqCst));
        assert!(!gone[1].1.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_aborts_stuck_writer_and_reader() {
        let connector = Arc::new(StuckConnector::default());
        let config = SessionConfig {
            close_timeout: Duration::from_millis(50),
            ..SessionConfig::default()
        };
        let (_tx, rx) = watch::channel(Settings::default());
        let mgr = ConnectionManager::new(connector.clone(), config, rx);
        mgr.connect(device(), None).await.unwrap();

        mgr.disconnect().await;

        assert_eq!(mgr.state(), SessionState::Closed);
        let gone = connector.gone.lock().unwrap();
        assert!(gone[0].0.load(Ordering::SeqCst));
        assert!(gone[0].1.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_connect_fails_and_can_be_retried() {
        // Arrange
        let connector = Arc::new(ChannelConnector {
            stall_first: true,
            ..Default::default()
        });
        let mgr = manager(connector.clone());
        let status = mgr.subscribe_status();

        // Act: the caller gives up long before the connect timeout
        let abandoned = time::timeout(Duration::from_millis(20), mgr.connect(device(), None)).await;

        // Assert
        assert!(abandoned.is_err());
        assert_eq!(mgr.state(), SessionState::Failed);
        assert_eq!(status.borrow().last_error.as_deref(), Some("connect cancelled"));

        let attempted = mgr.reconnect().await.unwrap();
        assert!(attempted);
        assert_eq!(mgr.state(), SessionState::Open);
        assert_eq!(connector.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_completed_connect_is_not_marked_failed_afterwards() {
        let connector = Arc::new(ChannelConnector::default());
        let mgr = manager(connector);

        mgr.connect(device(), None).await.unwrap();

        let status = mgr.subscribe_status();
        assert_eq!(status.borrow().state, SessionState::Open);
        assert_eq!(status.borrow().last_error, None);
    }

    #[test]
    fn test_reap_accepts_cancelled_and_panicked_tasks() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let cancelled = tokio::spawn(std::future::pending::<()>());
            cancelled.abort();
            let result = cancelled.await;
            assert!(result.as_ref().unwrap_err().is_cancelled());
            reap("ticker", result);

            let panicked = tokio::spawn(async { panic!("boom") }).await;
            assert!(panicked.as_ref().unwrap_err().is_panic());
            reap("pump", panicked);
        });
    }
}
