//! Hardware abstraction for the signal lamps.
//!
//! The lot signal is three independent binary outputs (green, yellow, red).
//! How those map to pins, relays or anything else is left to the
//! [`SignalLights`] implementation, so one occupancy core can drive any
//! wiring scheme.
//!
//! # Implementations
//!
//! | Type | Where |
//! |------|-------|
//! | `MockLights` | [`crate::hal::mock`], records every write |
//! | `LogLights` | [`crate::hal::log`], logs color changes (desktop runs) |
//! | `PinLights` | `hal::gpio`, any three `embedded_hal` output pins (requires `gpio` feature) |
//!
//! # Example
//!
//! ```rust
//! use parking_signal::hal::MockLights;
//! use parking_signal::traits::SignalLights;
//! use parking_signal::SignalColor;
//!
//! let mut lights = MockLights::new();
//! lights.show(SignalColor::Yellow).unwrap();
//! assert_eq!(lights.levels(), (false, true, false));
//!
//! lights.all_off().unwrap();
//! assert_eq!(lights.levels(), (false, false, false));
//! ```

use crate::occupancy::SignalColor;

/// Three-lamp signal output.
///
/// Implementors only provide [`set_levels`](Self::set_levels); `show` and
/// `all_off` are expressed in terms of it so every driver agrees on which
/// lamp belongs to which color.
///
/// # Implementation Notes
///
/// - Calls must return promptly; they run while the occupancy lock is held
/// - A failed write should leave the previous lamps untouched where possible
///
/// # Example Implementation
///
/// ```rust,ignore
/// use parking_signal::traits::SignalLights;
///
/// struct RelayBoard { /* handles */ }
///
/// impl SignalLights for RelayBoard {
///     type Error = std::io::Error;
///
///     fn set_levels(&mut self, green: bool, yellow: bool, red: bool) -> Result<(), Self::Error> {
///         self.write_relays([green, yellow, red])
///     }
/// }
/// ```
pub trait SignalLights {
    /// Error type for output writes.
    type Error: core::fmt::Debug;

    /// Drive the three outputs (green, yellow, red) to the given levels.
    fn set_levels(&mut self, green: bool, yellow: bool, red: bool) -> Result<(), Self::Error>;

    /// Light exactly the lamp for `color`.
    fn show(&mut self, color: SignalColor) -> Result<(), Self::Error> {
        let (green, yellow, red) = color.lamp_levels();
        self.set_levels(green, yellow, red)
    }

    /// Turn every lamp off.
    fn all_off(&mut self) -> Result<(), Self::Error> {
        self.set_levels(false, false, false)
    }
}
