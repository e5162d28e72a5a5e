//! Periodic re-announcement of the current count.
//!
//! Late subscribers and dashboards that missed the retained message still see
//! the count within one interval. Failures are expected while the broker is
//! down and are only logged at `debug`; the next tick retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::traits::Publisher;

use super::shared::SharedOccupancy;

/// Publishes the count (not retained) on a fixed interval.
pub struct PeriodicAnnouncer {
    occupancy: Arc<SharedOccupancy>,
    publisher: Arc<dyn Publisher>,
    topic: String,
    period: Duration,
}

impl PeriodicAnnouncer {
    /// Announce on `topic` every `period`.
    pub fn new(
        occupancy: Arc<SharedOccupancy>,
        publisher: Arc<dyn Publisher>,
        topic: impl Into<String>,
        period: Duration,
    ) -> Self {
        Self {
            occupancy,
            publisher,
            topic: topic.into(),
            period,
        }
    }

    /// Publish once. Returns whether the publish was accepted.
    pub fn announce(&self) -> bool {
        let snapshot = self.occupancy.snapshot();
        let payload = snapshot.count.to_string();
        match self.publisher.publish(&self.topic, payload.as_bytes(), false) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, count = snapshot.count, "announce skipped");
                false
            }
        }
    }

    /// Announce immediately, then every period until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if self.occupancy.is_closed() {
                        break;
                    }
                    self.announce();
                }
            }
        }
        info!("announcer stopped");
    }
}
