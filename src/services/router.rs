//! Inbound message routing and dashboard action forwarding.
//!
//! [`EventRouter`] is the [`TransportHandler`] registered with the reconnect
//! supervisor. It maps each topic to its vocabulary:
//!
//! | Topic | Parser | Unknown payload |
//! |-------|--------|-----------------|
//! | event topic | [`interpret`] (trimmed, lowercased) | logged, ignored |
//! | command topic (if different) | [`DashboardAction::parse`] (exact) | logged as invalid action |
//!
//! Dashboard actions never touch the counter directly. [`forward_action`]
//! publishes the action name on the command topic and the count changes when
//! the broker delivers it back, the same path a detector event takes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::commands::{interpret, Command, DashboardAction};
use crate::traits::{ConnectionState, MqttMessage, Publisher, TransportHandler};

use super::api::ActionResponse;
use super::shared::SharedOccupancy;

/// Routes broker messages into the shared occupancy state.
pub struct EventRouter {
    occupancy: Arc<SharedOccupancy>,
    events_topic: String,
    commands_topic: String,
}

impl EventRouter {
    /// Route `events_topic` through the detector interpreter and
    /// `commands_topic` through the dashboard action parser.
    ///
    /// When both are the same topic, the detector interpreter handles it;
    /// action names like `SetFull` lowercase into detector keywords.
    pub fn new(
        occupancy: Arc<SharedOccupancy>,
        events_topic: impl Into<String>,
        commands_topic: impl Into<String>,
    ) -> Self {
        Self {
            occupancy,
            events_topic: events_topic.into(),
            commands_topic: commands_topic.into(),
        }
    }

    fn on_event(&self, payload: &[u8]) {
        // Unrecognized payloads are logged by SharedOccupancy.
        self.occupancy.apply(&interpret(payload));
    }

    fn on_command(&self, message: &MqttMessage) {
        let action = message.payload_str().and_then(DashboardAction::parse);
        match action {
            Some(action) => {
                debug!(action = action.as_str(), "dashboard action received");
                self.occupancy.apply(&Command::from(action));
            }
            None => {
                warn!(
                    payload = %String::from_utf8_lossy(&message.payload),
                    "invalid action"
                );
            }
        }
    }
}

impl TransportHandler for EventRouter {
    fn on_message(&self, message: &MqttMessage) {
        if message.topic == self.events_topic {
            self.on_event(&message.payload);
        } else if message.topic == self.commands_topic {
            self.on_command(message);
        } else {
            debug!(topic = %message.topic, "message on unrouted topic");
        }
    }

    fn on_connection_change(&self, state: ConnectionState) {
        info!(state = %state, "broker connection");
        self.occupancy.viewers().announce_connection(state);
    }
}

/// Validate a dashboard action and publish it on the command topic.
///
/// Returns the acknowledgement for the requester: rejected for unknown names
/// (case-sensitive) or when the publish fails, accepted otherwise.
pub fn forward_action(publisher: &dyn Publisher, command_topic: &str, name: &str) -> ActionResponse {
    let Some(action) = DashboardAction::parse(name) else {
        warn!(action = name, "invalid action requested");
        return ActionResponse::rejected(format!("invalid action: {name}"));
    };

    match publisher.publish(command_topic, action.as_str().as_bytes(), false) {
        Ok(()) => {
            info!(action = action.as_str(), "dashboard action forwarded");
            ActionResponse::accepted(format!("{} sent", action.as_str()))
        }
        Err(e) => {
            warn!(action = action.as_str(), error = %e, "dashboard action not forwarded");
            ActionResponse::rejected(e.to_string())
        }
    }
}
