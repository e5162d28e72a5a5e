//! Broadcast sinks: everything that reacts to a new occupancy snapshot.
//!
//! Sinks are invoked by `SharedOccupancy` in registration order, inside the
//! same critical section that mutated the count. That gives every sink the
//! same view of the world, in the same order, but it also means:
//!
//! - `receive` must return promptly (no network round-trips, no waiting)
//! - `receive` must not call back into `SharedOccupancy`
//!
//! A failing sink is logged and skipped; the remaining sinks still run.
//!
//! | Sink | Effect |
//! |------|--------|
//! | [`ActuatorSink`] | lights exactly one lamp |
//! | [`RepublishSink`] | publishes the decimal count, retained |
//! | [`ViewerHub`] | pushes the snapshot to every connected viewer |

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::occupancy::OccupancyUpdate;
use crate::services::api::ViewerEvent;
use crate::traits::{ConnectionState, PublishError, Publisher, SignalLights};

/// Default per-viewer buffer. A viewer further behind than this is resynced.
pub const VIEWER_BUFFER: usize = 32;

/// Why a sink could not take an update.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The lamp driver reported an error.
    #[error("actuator write failed: {0}")]
    Actuator(String),
    /// The publish was refused.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Receiver of occupancy snapshots.
pub trait OccupancySink: Send {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    /// Handle a new snapshot.
    fn receive(&mut self, update: &OccupancyUpdate) -> Result<(), SinkError>;

    /// Called once with the starting state, before any command is applied.
    fn prime(&mut self, _initial: &OccupancyUpdate) -> Result<(), SinkError> {
        Ok(())
    }

    /// Called once when the process shuts down.
    fn shutdown(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

// ============================================================================
// Actuator
// ============================================================================

/// Drives the signal lamps from the current color.
pub struct ActuatorSink<L> {
    lights: L,
}

impl<L: SignalLights + Send> ActuatorSink<L> {
    /// Wrap a lamp driver.
    pub fn new(lights: L) -> Self {
        Self { lights }
    }

    /// The wrapped driver.
    pub fn lights(&self) -> &L {
        &self.lights
    }
}

impl<L: SignalLights + Send> OccupancySink for ActuatorSink<L> {
    fn name(&self) -> &'static str {
        "actuator"
    }

    fn receive(&mut self, update: &OccupancyUpdate) -> Result<(), SinkError> {
        self.lights
            .show(update.color)
            .map_err(|e| SinkError::Actuator(format!("{e:?}")))
    }

    fn prime(&mut self, initial: &OccupancyUpdate) -> Result<(), SinkError> {
        self.receive(initial)
    }

    fn shutdown(&mut self) -> Result<(), SinkError> {
        self.lights
            .all_off()
            .map_err(|e| SinkError::Actuator(format!("{e:?}")))
    }
}

// ============================================================================
// Republish
// ============================================================================

/// Publishes the count to the total topic on every change.
pub struct RepublishSink {
    publisher: Arc<dyn Publisher>,
    topic: String,
}

impl RepublishSink {
    /// Publish to `topic` through `publisher`.
    pub fn new(publisher: Arc<dyn Publisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }
}

impl OccupancySink for RepublishSink {
    fn name(&self) -> &'static str {
        "republish"
    }

    fn receive(&mut self, update: &OccupancyUpdate) -> Result<(), SinkError> {
        let payload = update.count.to_string();
        self.publisher.publish(&self.topic, payload.as_bytes(), true)?;
        Ok(())
    }
}

// ============================================================================
// Viewer fan-out
// ============================================================================

/// Fan-out to dashboard viewers.
///
/// A cheap `Clone` handle over a broadcast channel. Sending never blocks: a
/// viewer that falls behind loses old events and is expected to resync from
/// a fresh snapshot. Having no viewers at all is not an error.
#[derive(Clone, Debug)]
pub struct ViewerHub {
    tx: broadcast::Sender<ViewerEvent>,
}

impl Default for ViewerHub {
    fn default() -> Self {
        Self::new(VIEWER_BUFFER)
    }
}

impl ViewerHub {
    /// Create a hub buffering up to `capacity` events per viewer.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a viewer. Only events sent after this call are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.tx.subscribe()
    }

    /// Number of connected viewers.
    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Tell every viewer about a connection change.
    pub fn announce_connection(&self, state: ConnectionState) {
        self.send(ViewerEvent::connection(state));
    }

    fn send(&self, event: ViewerEvent) {
        // Err only means nobody is listening.
        if let Ok(n) = self.tx.send(event) {
            debug!(viewers = n, "viewer event sent");
        }
    }
}

impl OccupancySink for ViewerHub {
    fn name(&self) -> &'static str {
        "viewers"
    }

    fn receive(&mut self, update: &OccupancyUpdate) -> Result<(), SinkError> {
        self.send(ViewerEvent::from(*update));
        Ok(())
    }
}
