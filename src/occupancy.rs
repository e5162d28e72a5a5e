//! Occupancy count and the signal color derived from it.
//!
//! [`Occupancy`] is the plain, single-threaded state machine: it holds the
//! count and applies [`Command`]s to it. Thread-safe sharing and sink
//! broadcast live in `services::shared`, which wraps this type in a mutex.
//!
//! # Example
//!
//! ```rust
//! use parking_signal::{Command, Occupancy, SignalColor, Thresholds};
//!
//! let mut occupancy = Occupancy::new(Thresholds::default());
//! occupancy.apply(&Command::SetFull);
//! occupancy.apply(&Command::Increment);
//!
//! assert_eq!(occupancy.count(), 36);
//! assert_eq!(occupancy.color(), SignalColor::Red);
//! ```

use serde::{Deserialize, Serialize};

use crate::commands::{ApplyOutcome, Command};

/// Default count at which the signal turns yellow.
pub const WARN_THRESHOLD: u32 = 30;

/// Default count at which the signal turns red (and the value `SetFull` writes).
pub const FULL_THRESHOLD: u32 = 35;

// ============================================================================
// Signal Color
// ============================================================================

/// Three-level indicator shown to drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalColor {
    /// Plenty of space.
    Green,
    /// Nearly full.
    Yellow,
    /// Full (or over).
    Red,
}

impl SignalColor {
    /// Returns the color as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SignalColor::Green => "green",
            SignalColor::Yellow => "yellow",
            SignalColor::Red => "red",
        }
    }

    /// Output levels for the (green, yellow, red) lamps.
    ///
    /// Exactly one of the three is `true`.
    #[inline]
    pub const fn lamp_levels(&self) -> (bool, bool, bool) {
        match self {
            SignalColor::Green => (true, false, false),
            SignalColor::Yellow => (false, true, false),
            SignalColor::Red => (false, false, true),
        }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Count boundaries for the yellow and red colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    /// First count shown as yellow.
    pub warn: u32,
    /// First count shown as red. Also the value written by `SetFull`.
    pub full: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn: WARN_THRESHOLD,
            full: FULL_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Create thresholds. Callers are expected to keep `warn <= full`;
    /// configuration loading rejects anything else.
    pub const fn new(warn: u32, full: u32) -> Self {
        Self { warn, full }
    }

    /// Color for a given count.
    ///
    /// ```rust
    /// use parking_signal::{SignalColor, Thresholds};
    ///
    /// let t = Thresholds::default();
    /// assert_eq!(t.color_for(29), SignalColor::Green);
    /// assert_eq!(t.color_for(30), SignalColor::Yellow);
    /// assert_eq!(t.color_for(35), SignalColor::Red);
    /// ```
    pub const fn color_for(&self, count: u32) -> SignalColor {
        if count >= self.full {
            SignalColor::Red
        } else if count >= self.warn {
            SignalColor::Yellow
        } else {
            SignalColor::Green
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// A consistent (count, color) pair handed to sinks and readers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyUpdate {
    /// Vehicles currently counted.
    pub count: u32,
    /// Color derived from `count` at the moment the snapshot was taken.
    pub color: SignalColor,
}

// ============================================================================
// Occupancy
// ============================================================================

/// The occupancy counter.
///
/// Not thread-safe on its own; see `SharedOccupancy` for the locked wrapper.
#[derive(Clone, Debug)]
pub struct Occupancy {
    count: u32,
    thresholds: Thresholds,
}

impl Occupancy {
    /// Create an empty lot.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            count: 0,
            thresholds,
        }
    }

    /// Current count.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Current color, computed from the count.
    #[inline]
    pub fn color(&self) -> SignalColor {
        self.thresholds.color_for(self.count)
    }

    /// Configured thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Snapshot of count and color.
    pub fn snapshot(&self) -> OccupancyUpdate {
        OccupancyUpdate {
            count: self.count,
            color: self.color(),
        }
    }

    /// Apply a command.
    ///
    /// Returns [`ApplyOutcome::Ignored`] for unrecognized payloads; every other
    /// command reports [`ApplyOutcome::Changed`], even when the count ends up
    /// where it was (a decrement at zero is still a processed event).
    pub fn apply(&mut self, cmd: &Command) -> ApplyOutcome {
        self.count = match cmd {
            Command::Increment => self.count.saturating_add(1),
            Command::Decrement => self.count.saturating_sub(1),
            Command::Reset => 0,
            Command::SetFull => self.thresholds.full,
            Command::Unrecognized(_) => return ApplyOutcome::Ignored,
        };
        ApplyOutcome::Changed(self.snapshot())
    }
}

impl Default for Occupancy {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}
