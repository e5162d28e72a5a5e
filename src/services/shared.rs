//! Shared occupancy state for every service.
//!
//! `SharedOccupancy` owns the one [`Occupancy`] counter and the broadcast
//! sinks. The event router, the announcer and the dashboard all hold the same
//! `Arc<SharedOccupancy>`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_signal::hal::MockLights;
//! use parking_signal::services::SharedOccupancy;
//! use parking_signal::sinks::{ActuatorSink, ViewerHub};
//! use parking_signal::{Command, Occupancy};
//!
//! let lights = MockLights::new();
//! let state = Arc::new(SharedOccupancy::new(
//!     Occupancy::default(),
//!     vec![Box::new(ActuatorSink::new(lights.clone()))],
//!     ViewerHub::default(),
//! ));
//!
//! state.apply(&Command::Increment);
//! assert_eq!(state.snapshot().count, 1);
//! ```

use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::commands::{ApplyOutcome, Command};
use crate::occupancy::{Occupancy, OccupancyUpdate, Thresholds};
use crate::services::api::ViewerEvent;
use crate::sinks::{OccupancySink, ViewerHub};

struct Inner {
    occupancy: Occupancy,
    sinks: Vec<Box<dyn OccupancySink>>,
    closed: bool,
}

/// Thread-safe occupancy state plus its broadcast sinks.
///
/// # Thread Safety
///
/// One `Mutex` guards the counter and the sinks together and is held for the
/// whole mutate → recompute color → invoke sinks sequence. Two concurrent
/// commands therefore produce two complete, ordered broadcasts and never an
/// interleaving of them. A `Mutex` is used rather than an async lock because
/// nothing inside the critical section awaits.
pub struct SharedOccupancy {
    inner: Mutex<Inner>,
    viewers: ViewerHub,
}

impl SharedOccupancy {
    /// Create shared state.
    ///
    /// `sinks` run in the given order on every change; `viewers` always runs
    /// last. Every sink is primed with the initial snapshot (count 0, green).
    pub fn new(occupancy: Occupancy, sinks: Vec<Box<dyn OccupancySink>>, viewers: ViewerHub) -> Self {
        let mut inner = Inner {
            occupancy,
            sinks,
            closed: false,
        };
        inner.sinks.push(Box::new(viewers.clone()));

        let initial = inner.occupancy.snapshot();
        for sink in inner.sinks.iter_mut() {
            if let Err(e) = sink.prime(&initial) {
                warn!(sink = sink.name(), error = %e, "sink failed to take initial state");
            }
        }

        Self {
            inner: Mutex::new(inner),
            viewers,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Sinks are isolated by Result, so a panic under the lock leaves the
        // counter itself consistent; keep serving.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a command and broadcast the result.
    ///
    /// Unrecognized commands are logged and change nothing. After
    /// [`shutdown`](Self::shutdown), every command returns
    /// [`ApplyOutcome::Closed`].
    pub fn apply(&self, cmd: &Command) -> ApplyOutcome {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.closed {
            return ApplyOutcome::Closed;
        }

        let outcome = inner.occupancy.apply(cmd);
        let ApplyOutcome::Changed(update) = outcome else {
            warn!(command = %cmd, "unrecognized event ignored");
            return outcome;
        };

        info!(
            command = cmd.name(),
            count = update.count,
            color = update.color.as_str(),
            "occupancy updated"
        );

        for sink in inner.sinks.iter_mut() {
            if let Err(e) = sink.receive(&update) {
                warn!(sink = sink.name(), error = %e, "sink failed");
            }
        }

        outcome
    }

    /// Consistent (count, color) snapshot.
    pub fn snapshot(&self) -> OccupancyUpdate {
        self.lock().occupancy.snapshot()
    }

    /// Configured thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.lock().occupancy.thresholds()
    }

    /// Register a viewer.
    ///
    /// The snapshot and the subscription are taken under the same lock, so
    /// the viewer sees exactly the current value followed by every later
    /// change, with no gap and no replay.
    pub fn subscribe_viewer(&self) -> (OccupancyUpdate, broadcast::Receiver<ViewerEvent>) {
        let inner = self.lock();
        let rx = self.viewers.subscribe();
        (inner.occupancy.snapshot(), rx)
    }

    /// The viewer hub (for connection announcements).
    pub fn viewers(&self) -> &ViewerHub {
        &self.viewers
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Stop accepting commands and let every sink release its outputs.
    ///
    /// Idempotent: only the first call reaches the sinks.
    pub fn shutdown(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.closed {
            return;
        }
        inner.closed = true;

        for sink in inner.sinks.iter_mut() {
            if let Err(e) = sink.shutdown() {
                warn!(sink = sink.name(), error = %e, "sink shutdown failed");
            }
        }
        info!(count = inner.occupancy.count(), "occupancy state closed");
    }
}
