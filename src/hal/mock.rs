//! Mock implementations for testing without hardware or a broker.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockLights`] | [`SignalLights`] | Records lamp writes, can be told to fail |
//! | [`MockPublisher`] | [`Publisher`] | Captures publishes, switchable connection state |
//! | [`ScriptedTransport`] | [`Transport`] | Replays a script of poll results |
//! | [`MockViewer`] | [`ViewerSocket`] | In-memory viewer connection with a client end |
//!
//! All three are cheap `Clone` handles over shared state: hand one clone to
//! the code under test and keep another to inspect what happened.
//!
//! # Example
//!
//! ```rust
//! use parking_signal::hal::MockPublisher;
//! use parking_signal::traits::Publisher;
//!
//! let publisher = MockPublisher::new();
//! publisher.publish("lot/total", b"12", true).unwrap();
//!
//! let sent = publisher.published_to("lot/total");
//! assert_eq!(sent, vec![(b"12".to_vec(), true)]);
//! ```
//!
//! [`SignalLights`]: crate::traits::SignalLights
//! [`Publisher`]: crate::traits::Publisher
//! [`Transport`]: crate::traits::Transport
//! [`ViewerSocket`]: crate::traits::ViewerSocket

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::traits::{
    ConnectionState, MqttMessage, PublishError, Publisher, SignalLights, Transport,
    TransportError, TransportEvent, ViewerClosed, ViewerSocket,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Mocks are only touched from tests; a poisoned lock means a test already panicked.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Lights
// ============================================================================

#[derive(Debug, Default)]
struct LightsInner {
    levels: (bool, bool, bool),
    writes: Vec<(bool, bool, bool)>,
    fail_writes: bool,
}

/// Mock signal lamps.
///
/// Records every write. Use [`set_failing`](Self::set_failing) to simulate
/// a broken output driver.
#[derive(Clone, Debug, Default)]
pub struct MockLights {
    inner: Arc<Mutex<LightsInner>>,
}

/// Error returned by [`MockLights`] while failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockLightsError;

impl MockLights {
    /// Creates mock lamps, all off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current (green, yellow, red) levels.
    pub fn levels(&self) -> (bool, bool, bool) {
        lock(&self.inner).levels
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> Vec<(bool, bool, bool)> {
        lock(&self.inner).writes.clone()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        lock(&self.inner).fail_writes = failing;
    }
}

impl SignalLights for MockLights {
    type Error = MockLightsError;

    fn set_levels(&mut self, green: bool, yellow: bool, red: bool) -> Result<(), MockLightsError> {
        let mut inner = lock(&self.inner);
        if inner.fail_writes {
            return Err(MockLightsError);
        }
        inner.levels = (green, yellow, red);
        inner.writes.push((green, yellow, red));
        Ok(())
    }
}

// ============================================================================
// Publisher
// ============================================================================

#[derive(Debug)]
struct PublisherInner {
    published: Vec<(String, Vec<u8>, bool)>,
    state: ConnectionState,
}

/// Mock publisher.
///
/// Publishes while [`ConnectionState::Connected`] are recorded; in any other
/// state they fail with [`PublishError::NotConnected`], like the real handle.
#[derive(Clone, Debug)]
pub struct MockPublisher {
    inner: Arc<Mutex<PublisherInner>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::with_state(ConnectionState::Connected)
    }
}

impl MockPublisher {
    /// Creates a mock publisher in connected state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock publisher in disconnected state.
    pub fn disconnected() -> Self {
        Self::with_state(ConnectionState::Disconnected)
    }

    fn with_state(state: ConnectionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PublisherInner {
                published: Vec::new(),
                state,
            })),
        }
    }

    /// Change the reported connection state.
    pub fn set_state(&self, state: ConnectionState) {
        lock(&self.inner).state = state;
    }

    /// All recorded publishes as (topic, payload, retain).
    pub fn published(&self) -> Vec<(String, Vec<u8>, bool)> {
        lock(&self.inner).published.clone()
    }

    /// Recorded (payload, retain) pairs for one topic.
    pub fn published_to(&self, topic: &str) -> Vec<(Vec<u8>, bool)> {
        lock(&self.inner)
            .published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, payload, retain)| (payload.clone(), *retain))
            .collect()
    }

    /// Forget recorded publishes.
    pub fn clear(&self) {
        lock(&self.inner).published.clear();
    }
}

impl Publisher for MockPublisher {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        let mut inner = lock(&self.inner);
        if !inner.state.is_connected() {
            return Err(PublishError::NotConnected);
        }
        inner.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        lock(&self.inner).state
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Default)]
struct TransportInner {
    script: VecDeque<Result<TransportEvent, TransportError>>,
    polls: Vec<Instant>,
    subscriptions: Vec<String>,
    fail_subscribe: bool,
    resets: usize,
    disconnected: bool,
}

/// Transport that replays a fixed script.
///
/// Each `poll` pops the next scripted result and records when it was
/// called. Once the script is exhausted, `poll` never completes, so the
/// supervisor idles until it is cancelled.
///
/// # Example
///
/// ```rust
/// use parking_signal::hal::ScriptedTransport;
/// use parking_signal::traits::{TransportError, TransportEvent};
///
/// let transport = ScriptedTransport::new();
/// transport.push_err(TransportError::Connect("refused".into()));
/// transport.push(TransportEvent::Connected);
/// transport.push_message("deepstream/car_count", b"entry");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<TransportInner>>,
}

impl ScriptedTransport {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful poll result.
    pub fn push(&self, event: TransportEvent) {
        lock(&self.inner).script.push_back(Ok(event));
    }

    /// Append an incoming message.
    pub fn push_message(&self, topic: &str, payload: &[u8]) {
        self.push(TransportEvent::Message(MqttMessage::new(topic, payload)));
    }

    /// Append a failed poll result.
    pub fn push_err(&self, err: TransportError) {
        lock(&self.inner).script.push_back(Err(err));
    }

    /// Make subscribe requests fail.
    pub fn set_fail_subscribe(&self, fail: bool) {
        lock(&self.inner).fail_subscribe = fail;
    }

    /// When each poll was started.
    pub fn poll_times(&self) -> Vec<Instant> {
        lock(&self.inner).polls.clone()
    }

    /// Every subscribe request, in order (repeats across reconnects).
    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.inner).subscriptions.clone()
    }

    /// Scripted results not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.inner).script.len()
    }

    /// How many times the session was dropped with `reset`.
    pub fn resets(&self) -> usize {
        lock(&self.inner).resets
    }

    /// Whether `disconnect` was called.
    pub fn was_disconnected(&self) -> bool {
        lock(&self.inner).disconnected
    }
}

impl Transport for ScriptedTransport {
    async fn poll(&mut self) -> Result<TransportEvent, TransportError> {
        let next = {
            let mut inner = lock(&self.inner);
            inner.polls.push(Instant::now());
            inner.script.pop_front()
        };
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let mut inner = lock(&self.inner);
        inner.subscriptions.push(topic.to_string());
        if inner.fail_subscribe {
            return Err(TransportError::Subscribe {
                topic: topic.to_string(),
                reason: "scripted failure".into(),
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        lock(&self.inner).resets += 1;
    }

    async fn disconnect(&mut self) {
        lock(&self.inner).disconnected = true;
    }
}

// ============================================================================
// Viewer
// ============================================================================

/// Server end of an in-memory viewer connection.
///
/// Hand it to the viewer session; drive the session from the
/// [`MockViewerClient`] returned alongside it.
#[derive(Debug)]
pub struct MockViewer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

/// Client end of a [`MockViewer`]: what a browser would send and see.
#[derive(Debug)]
pub struct MockViewerClient {
    from_server: mpsc::UnboundedReceiver<String>,
    to_server: Option<mpsc::UnboundedSender<String>>,
    closed: Arc<AtomicBool>,
}

impl MockViewer {
    /// Creates a connected server/client pair.
    pub fn pair() -> (Self, MockViewerClient) {
        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let server = Self {
            to_client,
            from_client,
            closed: Arc::clone(&closed),
        };
        let client = MockViewerClient {
            from_server,
            to_server: Some(to_server),
            closed,
        };
        (server, client)
    }
}

impl ViewerSocket for MockViewer {
    async fn send_text(&mut self, text: String) -> Result<(), ViewerClosed> {
        self.to_client.send(text).map_err(|_| ViewerClosed)
    }

    async fn recv_text(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl MockViewerClient {
    /// Send a text frame to the server. Ignored after [`hang_up`](Self::hang_up).
    pub fn send(&self, text: &str) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(text.to_string());
        }
    }

    /// Next frame from the server, or `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_server.recv().await
    }

    /// A frame the server already sent, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_server.try_recv().ok()
    }

    /// Leave, as a browser tab closing would.
    pub fn hang_up(&mut self) {
        self.to_server = None;
    }

    /// Whether the server closed the session.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
