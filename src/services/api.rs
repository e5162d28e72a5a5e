//! API request and response types for the dashboard (HTTP and WebSocket).

use serde::{Deserialize, Serialize};

use crate::occupancy::{OccupancyUpdate, SignalColor};
use crate::traits::ConnectionState;

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Current lot state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    /// Vehicles counted
    pub total: u32,
    /// Signal color
    pub color: SignalColor,
    /// Whether the broker session is up
    pub connected: bool,
}

impl StateResponse {
    /// Build from a snapshot and the connection state.
    pub fn new(update: OccupancyUpdate, connection: ConnectionState) -> Self {
        Self {
            total: update.count,
            color: update.color,
            connected: connection.is_connected(),
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Dashboard action request: `{"action": "Entry"}`
///
/// The name is kept as a raw string so unknown names can be rejected with a
/// message instead of a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// One of `Entry`, `Exit`, `Reset`, `SetFull` (case-sensitive)
    pub action: String,
}

/// Acknowledgement for one action request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Whether the action was forwarded
    pub accepted: bool,
    /// Human-readable outcome
    pub message: String,
}

impl ActionResponse {
    /// Create an accepted response
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
        }
    }

    /// Create a rejected response
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: reason.into(),
        }
    }
}

// ============================================================================
// Viewer Events
// ============================================================================

/// Message pushed to a dashboard viewer over its WebSocket.
///
/// ```json
/// {"type":"total_update","total":12,"color":"green"}
/// {"type":"connection","connected":false}
/// {"type":"action_response","accepted":false,"message":"transport unavailable"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    /// The count changed (or the viewer just joined).
    TotalUpdate {
        /// Vehicles counted
        total: u32,
        /// Signal color
        color: SignalColor,
    },
    /// Broker connection indicator.
    Connection {
        /// Whether the broker session is up
        connected: bool,
    },
    /// Reply to this viewer's own action request.
    ActionResponse {
        /// Whether the action was forwarded
        accepted: bool,
        /// Human-readable outcome
        message: String,
    },
}

impl ViewerEvent {
    /// Connection indicator for `state`.
    pub fn connection(state: ConnectionState) -> Self {
        ViewerEvent::Connection {
            connected: state.is_connected(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> String {
        // A tagged enum of plain fields cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<OccupancyUpdate> for ViewerEvent {
    fn from(update: OccupancyUpdate) -> Self {
        ViewerEvent::TotalUpdate {
            total: update.count,
            color: update.color,
        }
    }
}

impl From<ActionResponse> for ViewerEvent {
    fn from(response: ActionResponse) -> Self {
        ViewerEvent::ActionResponse {
            accepted: response.accepted,
            message: response.message,
        }
    }
}
