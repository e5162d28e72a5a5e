//! Signal lamps on `embedded-hal` output pins.
//!
//! [`PinLights`] drives any three [`OutputPin`]s, so the same occupancy core
//! works with a Raspberry Pi GPIO header, an I/O expander or a relay board,
//! whatever pin numbering scheme the board uses. Pin selection is done by the
//! caller when it constructs the pins.
//!
//! # Example
//!
//! ```rust,ignore
//! use parking_signal::hal::PinLights;
//!
//! // Relay boards usually switch on a low level.
//! let lights = PinLights::new(green_pin, yellow_pin, red_pin).active_low();
//! ```

use embedded_hal::digital::{Error as _, ErrorKind, OutputPin};
use thiserror::Error;

use crate::traits::SignalLights;

/// A lamp output could not be written.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("{lamp} output write failed: {kind:?}")]
pub struct PinError {
    /// Which lamp failed (`green`, `yellow` or `red`).
    pub lamp: &'static str,
    /// Driver error classification.
    pub kind: ErrorKind,
}

/// Three output pins acting as the lot signal.
#[derive(Debug)]
pub struct PinLights<G, Y, R> {
    green: G,
    yellow: Y,
    red: R,
    active_low: bool,
}

impl<G, Y, R> PinLights<G, Y, R>
where
    G: OutputPin,
    Y: OutputPin,
    R: OutputPin,
{
    /// Wrap three pins; a lit lamp is a high level.
    pub fn new(green: G, yellow: Y, red: R) -> Self {
        Self {
            green,
            yellow,
            red,
            active_low: false,
        }
    }

    /// Invert the levels: a lit lamp is a low level.
    pub fn active_low(mut self) -> Self {
        self.active_low = true;
        self
    }

    /// Give the pins back.
    pub fn release(self) -> (G, Y, R) {
        (self.green, self.yellow, self.red)
    }
}

fn drive<P: OutputPin>(pin: &mut P, lit: bool, active_low: bool, lamp: &'static str) -> Result<(), PinError> {
    let high = lit != active_low;
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|e| PinError { lamp, kind: e.kind() })
}

impl<G, Y, R> SignalLights for PinLights<G, Y, R>
where
    G: OutputPin,
    Y: OutputPin,
    R: OutputPin,
{
    type Error = PinError;

    fn set_levels(&mut self, green: bool, yellow: bool, red: bool) -> Result<(), PinError> {
        let low = self.active_low;
        // Switch lamps off before switching one on, so two are never lit together.
        if !green {
            drive(&mut self.green, false, low, "green")?;
        }
        if !yellow {
            drive(&mut self.yellow, false, low, "yellow")?;
        }
        if !red {
            drive(&mut self.red, false, low, "red")?;
        }
        if green {
            drive(&mut self.green, true, low, "green")?;
        }
        if yellow {
            drive(&mut self.yellow, true, low, "yellow")?;
        }
        if red {
            drive(&mut self.red, true, low, "red")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignalColor;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Debug, Default)]
    struct FakePin {
        high: bool,
    }

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
    }

    fn pins() -> PinLights<FakePin, FakePin, FakePin> {
        PinLights::new(FakePin::default(), FakePin::default(), FakePin::default())
    }

    #[test]
    fn test_show_drives_one_pin_high() {
        let mut lights = pins();
        lights.show(SignalColor::Yellow).unwrap();
        let (g, y, r) = lights.release();
        assert!(!g.high);
        assert!(y.high);
        assert!(!r.high);
    }

    #[test]
    fn test_active_low_inverts() {
        let mut lights = pins().active_low();
        lights.show(SignalColor::Green).unwrap();
        let (g, y, r) = lights.release();
        assert!(!g.high);
        assert!(y.high);
        assert!(r.high);
    }

    #[test]
    fn test_all_off_active_low_is_all_high() {
        let mut lights = pins().active_low();
        lights.show(SignalColor::Red).unwrap();
        lights.all_off().unwrap();
        let (g, y, r) = lights.release();
        assert!(g.high && y.high && r.high);
    }
}
