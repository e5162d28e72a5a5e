//! Reconnection supervisor.
//!
//! [`ReconnectSupervisor`] owns one [`Transport`] and is the only task that
//! polls it, so at most one connection attempt is ever in flight. It:
//!
//! - publishes [`ConnectionState`] changes on a `watch` channel
//! - re-issues every subscription after each successful (re)connect
//! - waits [`Backoff`] delays between failed attempts (5s, 10s, 20s, 40s, 60s, 60s, ...)
//! - hands inbound messages to the registered [`TransportHandler`]
//! - stops when its `CancellationToken` fires, closing the session cleanly
//!
//! ```text
//!  Disconnected ──poll──▶ Connecting ──ConnAck──▶ Connected
//!       ▲                     │                      │
//!       └──── sleep(backoff) ◀┴──────── error ───────┘
//! ```
//!
//! A session whose subscriptions cannot be issued is reset, not kept: the
//! retry must see a fresh `Connected` to subscribe again.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::ReconnectConfig;
use crate::traits::{ConnectionState, Transport, TransportError, TransportEvent, TransportHandler};

// ============================================================================
// Connection Monitor
// ============================================================================

/// Read side of the supervisor's connection state.
///
/// Cheap to clone; every clone observes the same state.
#[derive(Clone, Debug)]
pub struct ConnectionMonitor {
    rx: watch::Receiver<ConnectionState>,
}

impl ConnectionMonitor {
    /// Wrap a watch receiver.
    pub fn new(rx: watch::Receiver<ConnectionState>) -> Self {
        Self { rx }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.rx.borrow()
    }

    /// Whether the session is up.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Wait for the next change and return the new state.
    ///
    /// Returns `None` once the supervisor is gone.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until the state is `Connected`.
    pub async fn wait_connected(&mut self) -> Option<()> {
        self.rx.wait_for(|s| s.is_connected()).await.ok().map(|_| ())
    }
}

/// Create a connection state channel, starting `Disconnected`.
pub fn connection_channel() -> (watch::Sender<ConnectionState>, ConnectionMonitor) {
    let (tx, rx) = watch::channel(ConnectionState::Disconnected);
    (tx, ConnectionMonitor::new(rx))
}

// ============================================================================
// Supervisor
// ============================================================================

/// Keeps one transport session alive.
pub struct ReconnectSupervisor<T: Transport> {
    transport: T,
    backoff: Backoff,
    subscriptions: Vec<String>,
    handler: Arc<dyn TransportHandler>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

impl<T: Transport> ReconnectSupervisor<T> {
    /// Create a supervisor.
    ///
    /// `state` is the sending half of the channel the publisher and the
    /// dashboard observe; see [`connection_channel`].
    pub fn new(
        transport: T,
        config: &ReconnectConfig,
        handler: Arc<dyn TransportHandler>,
        state: watch::Sender<ConnectionState>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            backoff: Backoff::new(config.base(), config.max()),
            subscriptions: Vec::new(),
            handler,
            state,
            shutdown,
        }
    }

    /// Add a topic to (re)subscribe on every connect. Duplicates are ignored.
    pub fn subscribe(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        if !self.subscriptions.contains(&topic) {
            self.subscriptions.push(topic);
        }
        self
    }

    /// Topics issued on every connect.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "connection state");
            self.handler.on_connection_change(next);
        }
    }

    async fn on_connected(&mut self) -> Result<(), TransportError> {
        for topic in &self.subscriptions {
            self.transport.subscribe(topic).await?;
            debug!(topic = %topic, "subscribed");
        }
        self.backoff.on_success();
        self.set_state(ConnectionState::Connected);
        info!(topics = self.subscriptions.len(), "broker connected");
        Ok(())
    }

    /// Run until cancelled.
    ///
    /// Never returns an error: every transport failure is logged and retried
    /// after the backoff delay.
    pub async fn run(mut self) {
        loop {
            if !self.state.borrow().is_connected() {
                self.set_state(ConnectionState::Connecting);
            }

            let polled = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                polled = self.transport.poll() => polled,
            };

            let result = match polled {
                Ok(TransportEvent::Connected) => {
                    let prepared = self.on_connected().await;
                    if prepared.is_err() {
                        // Half-prepared session: drop it so the retry gets a fresh ConnAck.
                        self.transport.reset();
                    }
                    prepared
                }
                Ok(TransportEvent::Message(message)) => {
                    self.handler.on_message(&message);
                    Ok(())
                }
                Ok(TransportEvent::Idle) => Ok(()),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                self.set_state(ConnectionState::Disconnected);
                let delay = self.backoff.on_failure();
                warn!(
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    failures = self.backoff.failures(),
                    "broker unavailable"
                );

                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.transport.disconnect().await;
        info!("supervisor stopped");
    }
}
