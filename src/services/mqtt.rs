//! MQTT transport over `rumqttc`.
//!
//! Two halves share one `rumqttc` client:
//!
//! - [`RumqttTransport`] owns the event loop and implements [`Transport`].
//!   Only the reconnect supervisor polls it.
//! - [`MqttHandle`] is a cloneable [`Publisher`]. It never waits: publishes
//!   are queued with `try_publish` while the supervisor reports `Connected`
//!   and rejected otherwise.
//!
//! **Subscribe Topics:**
//! - `deepstream/car_count` - detector events, free-form text
//! - command topic (if different) - dashboard action names
//!
//! **Publish Topics:**
//! - `estacionamiento/total` - decimal count (retained on change, plain on announce)
//! - command topic - dashboard action names
//!
//! # Example
//!
//! ```ignore
//! let (state_tx, monitor) = connection_channel();
//! let (transport, client) = RumqttTransport::new(&config.mqtt);
//! let publisher = MqttHandle::new(client, monitor, shutdown.clone());
//!
//! let supervisor = ReconnectSupervisor::new(transport, &config.reconnect, router, state_tx, shutdown);
//! ```

use std::time::Duration;

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::MqttConfig;
use crate::traits::{
    ConnectionState, MqttMessage, PublishError, Publisher, Transport, TransportError,
    TransportEvent,
};

use super::supervisor::ConnectionMonitor;

/// Requests buffered between the handle and the event loop.
pub const REQUEST_CAPACITY: usize = 32;

/// How long `disconnect` waits for the DISCONNECT packet to go out.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

// ============================================================================
// Options
// ============================================================================

/// Build `rumqttc` options from configuration.
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        config.client_id.as_str(),
        config.host.as_str(),
        config.port,
    );
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options.set_clean_session(true);
    if config.has_auth() {
        options.set_credentials(config.username.as_str(), config.password.as_str());
    }
    options
}

// ============================================================================
// Transport
// ============================================================================

/// [`Transport`] backed by a `rumqttc` event loop.
///
/// The event loop connects lazily on poll and reconnects on the poll after an
/// error, which is exactly the contract the supervisor expects.
pub struct RumqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    connected: bool,
}

impl RumqttTransport {
    /// Create the transport and the client the publisher side will use.
    ///
    /// Nothing touches the network until the first `poll`.
    pub fn new(config: &MqttConfig) -> (Self, AsyncClient) {
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
        eventloop
            .network_options
            .set_connection_timeout(config.connect_timeout_secs);

        let transport = Self {
            client: client.clone(),
            eventloop,
            connected: false,
        };
        (transport, client)
    }

    fn classify(&mut self, error: ConnectionError) -> TransportError {
        let was_connected = std::mem::replace(&mut self.connected, false);
        if was_connected {
            TransportError::ConnectionLost(error.to_string())
        } else {
            TransportError::Connect(error.to_string())
        }
    }
}

impl Transport for RumqttTransport {
    async fn poll(&mut self) -> Result<TransportEvent, TransportError> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                debug!(session_present = ack.session_present, "connack");
                self.connected = true;
                Ok(TransportEvent::Connected)
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(TransportEvent::Message(
                MqttMessage::new(publish.topic, publish.payload.to_vec()),
            )),
            Ok(_) => Ok(TransportEvent::Idle),
            Err(e) => Err(self.classify(e)),
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        // Queued only; the SUBSCRIBE goes out on the next poll.
        self.client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| TransportError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    fn reset(&mut self) {
        // Drops the network; the next poll reconnects and yields a ConnAck.
        self.eventloop.clean();
        // Subscriptions are re-issued on connect; stale requests would duplicate them.
        self.eventloop.pending.clear();
        self.connected = false;
    }

    async fn disconnect(&mut self) {
        if !self.connected || self.client.try_disconnect().is_err() {
            return;
        }
        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        let _ = tokio::time::timeout(DISCONNECT_GRACE, flush).await;
        self.connected = false;
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// Connection-gated publisher over a `rumqttc` client.
#[derive(Clone)]
pub struct MqttHandle {
    client: AsyncClient,
    monitor: ConnectionMonitor,
    shutdown: CancellationToken,
}

impl MqttHandle {
    /// Gate `client` on the supervisor's connection state.
    pub fn new(client: AsyncClient, monitor: ConnectionMonitor, shutdown: CancellationToken) -> Self {
        Self {
            client,
            monitor,
            shutdown,
        }
    }
}

impl Publisher for MqttHandle {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        if self.shutdown.is_cancelled() {
            return Err(PublishError::ShuttingDown);
        }
        if !self.monitor.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.to_vec())
            .map_err(|e| PublishError::Rejected(e.to_string()))
    }

    fn connection_state(&self) -> ConnectionState {
        self.monitor.state()
    }
}
