//! Command types and payload interpretation.
//!
//! Two vocabularies map onto the same [`Command`]:
//!
//! - **Detector events** arrive on the event topic as free-form text. They are
//!   trimmed and lowercased, then matched by [`interpret`]. Entry events are
//!   matched by substring because the detector embeds them in a longer string
//!   (e.g. `car_entry_detected`); everything else must match exactly.
//! - **Dashboard actions** are the four case-sensitive names `Entry`, `Exit`,
//!   `Reset` and `SetFull`, parsed by [`DashboardAction::parse`]. Anything else
//!   is rejected explicitly instead of being dropped.
//!
//! # Example
//!
//! ```rust
//! use parking_signal::{interpret, Command, DashboardAction};
//!
//! assert_eq!(interpret(b"car_entry_detected"), Command::Increment);
//! assert_eq!(interpret(b"  EXIT \n"), Command::Decrement);
//!
//! assert_eq!(DashboardAction::parse("SetFull"), Some(DashboardAction::SetFull));
//! assert_eq!(DashboardAction::parse("setfull"), None);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::occupancy::OccupancyUpdate;

// ============================================================================
// Command
// ============================================================================

/// A parsed occupancy command. Built per message and consumed immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// One vehicle entered.
    Increment,
    /// One vehicle left (floored at zero).
    Decrement,
    /// Empty the lot.
    Reset,
    /// Jump to the full threshold.
    SetFull,
    /// Payload matched nothing; carries the raw bytes for logging.
    Unrecognized(Vec<u8>),
}

impl Command {
    /// Short name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Command::Increment => "increment",
            Command::Decrement => "decrement",
            Command::Reset => "reset",
            Command::SetFull => "setfull",
            Command::Unrecognized(_) => "unrecognized",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Unrecognized(raw) => {
                write!(f, "unrecognized({:?})", String::from_utf8_lossy(raw))
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Interpret a detector payload.
///
/// The payload is decoded as UTF-8 (lossily), trimmed and lowercased, then
/// matched in priority order:
///
/// 1. contains `entry` → [`Command::Increment`]
/// 2. equals `exit` → [`Command::Decrement`]
/// 3. equals `reset` → [`Command::Reset`]
/// 4. equals `setfull` → [`Command::SetFull`]
/// 5. anything else → [`Command::Unrecognized`] with the original bytes
pub fn interpret(payload: &[u8]) -> Command {
    let text = String::from_utf8_lossy(payload);
    let normalized = text.trim().to_lowercase();

    if normalized.contains("entry") {
        Command::Increment
    } else {
        match normalized.as_str() {
            "exit" => Command::Decrement,
            "reset" => Command::Reset,
            "setfull" => Command::SetFull,
            _ => Command::Unrecognized(payload.to_vec()),
        }
    }
}

// ============================================================================
// Dashboard Actions
// ============================================================================

/// Action a dashboard viewer may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashboardAction {
    /// Count one vehicle in.
    Entry,
    /// Count one vehicle out.
    Exit,
    /// Empty the lot.
    Reset,
    /// Mark the lot full.
    SetFull,
}

impl DashboardAction {
    /// All accepted actions.
    pub const ALL: [DashboardAction; 4] = [
        DashboardAction::Entry,
        DashboardAction::Exit,
        DashboardAction::Reset,
        DashboardAction::SetFull,
    ];

    /// Parse an action name. Case-sensitive and untrimmed.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Entry" => Some(DashboardAction::Entry),
            "Exit" => Some(DashboardAction::Exit),
            "Reset" => Some(DashboardAction::Reset),
            "SetFull" => Some(DashboardAction::SetFull),
            _ => None,
        }
    }

    /// The wire name, as published on the command topic.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DashboardAction::Entry => "Entry",
            DashboardAction::Exit => "Exit",
            DashboardAction::Reset => "Reset",
            DashboardAction::SetFull => "SetFull",
        }
    }
}

impl From<DashboardAction> for Command {
    fn from(action: DashboardAction) -> Self {
        match action {
            DashboardAction::Entry => Command::Increment,
            DashboardAction::Exit => Command::Decrement,
            DashboardAction::Reset => Command::Reset,
            DashboardAction::SetFull => Command::SetFull,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of applying a command to the occupancy state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The command was processed; carries the resulting snapshot.
    Changed(OccupancyUpdate),
    /// The command was unrecognized; nothing was mutated or broadcast.
    Ignored,
    /// The state has been shut down and no longer accepts commands.
    Closed,
}

impl ApplyOutcome {
    /// The new snapshot if the command was applied.
    pub fn update(&self) -> Option<OccupancyUpdate> {
        match self {
            ApplyOutcome::Changed(update) => Some(*update),
            _ => None,
        }
    }
}
