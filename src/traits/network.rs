//! Transport abstraction for the publish/subscribe broker.
//!
//! The broker connection is split into three roles so each consumer sees only
//! what it needs:
//!
//! | Trait | Used by | Purpose |
//! |-------|---------|---------|
//! | [`Transport`] | reconnect supervisor | one session: connect (on poll), subscribe, receive |
//! | [`Publisher`] | sinks, announcer, dashboard | non-blocking publish, gated on connection state |
//! | [`TransportHandler`] | supervisor → event router | inbound messages and connection changes |
//!
//! # Topics
//!
//! ```text
//! deepstream/car_count   - detector events (inbound, free-form text)
//! estacionamiento/total  - current count (outbound, decimal string)
//! ```
//!
//! # Invocation contract
//!
//! [`TransportHandler`] methods are called from the supervisor task. They must
//! not block and must not wait on anything the supervisor itself drives (for
//! example a publish acknowledgement), or inbound delivery stalls.

use core::fmt;
use core::future::Future;

use thiserror::Error;

// ============================================================================
// Connection State
// ============================================================================

/// Broker connection state, owned by the reconnect supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session. A reconnect may be scheduled.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Session established and subscriptions issued.
    Connected,
}

impl ConnectionState {
    /// Returns the state as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }

    /// Whether publishes are currently attempted.
    #[inline]
    pub const fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Messages and Errors
// ============================================================================

/// A message received from a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

/// What a single [`Transport::poll`] produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted a new session.
    Connected,
    /// A message arrived on a subscribed topic.
    Message(MqttMessage),
    /// Protocol traffic with no meaning above the transport (acks, pings).
    Idle,
}

/// Session-level failures. The supervisor recovers from all of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not establish a session.
    #[error("connect failed: {0}")]
    Connect(String),
    /// An established session dropped.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// A subscribe request could not be issued.
    #[error("subscribe to {topic} failed: {reason}")]
    Subscribe {
        /// Topic that failed.
        topic: String,
        /// Underlying reason.
        reason: String,
    },
}

/// Why a publish was not attempted or not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The transport is not connected; nothing is queued.
    #[error("transport unavailable")]
    NotConnected,
    /// The process is shutting down.
    #[error("shutting down")]
    ShuttingDown,
    /// The client refused the request (e.g. its outbound queue is full).
    #[error("publish rejected: {0}")]
    Rejected(String),
}

// ============================================================================
// Transport
// ============================================================================

/// One broker session.
///
/// There is no explicit `connect`: a poll with no live session performs the
/// connection attempt and yields [`TransportEvent::Connected`] or
/// [`TransportError::Connect`]. This matches event-loop style clients where
/// the connection is driven by polling.
///
/// # Implementation Notes
///
/// - Connection attempts must be bounded by a timeout
/// - After an error, the next `poll` starts a fresh attempt
/// - Subscriptions are not assumed to survive a dropped session
pub trait Transport: Send {
    /// Drive the session until something happens.
    fn poll(&mut self) -> impl Future<Output = Result<TransportEvent, TransportError>> + Send;

    /// Request a subscription on the current session.
    fn subscribe(&mut self, topic: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Drop the current session without a clean close.
    ///
    /// Used when a session came up but could not be prepared (a subscribe
    /// failed). The next `poll` must start a fresh connection attempt.
    fn reset(&mut self);

    /// Close the session cleanly. Errors are ignored; the process is leaving.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}

// ============================================================================
// Publisher
// ============================================================================

/// Non-blocking publisher.
///
/// `publish` must return immediately: it is called while the occupancy lock
/// is held. When the transport is not [`ConnectionState::Connected`] the call
/// fails with [`PublishError::NotConnected`] instead of queueing.
///
/// # Example
///
/// ```rust
/// use parking_signal::hal::MockPublisher;
/// use parking_signal::traits::{Publisher, PublishError};
///
/// let publisher = MockPublisher::disconnected();
/// assert_eq!(
///     publisher.publish("lot/total", b"3", true),
///     Err(PublishError::NotConnected)
/// );
/// ```
pub trait Publisher: Send + Sync {
    /// Publish `payload` to `topic`.
    ///
    /// # Arguments
    /// - `topic`: topic path
    /// - `payload`: message bytes
    /// - `retain`: if true, broker keeps the message for new subscribers
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError>;

    /// Current connection state.
    fn connection_state(&self) -> ConnectionState;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Receiver for inbound transport traffic.
///
/// Registered with the reconnect supervisor; see the module docs for the
/// invocation contract.
pub trait TransportHandler: Send + Sync {
    /// A message arrived on a subscribed topic.
    fn on_message(&self, message: &MqttMessage);

    /// The connection state changed.
    fn on_connection_change(&self, _state: ConnectionState) {}
}
