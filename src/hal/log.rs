//! Signal lamps that only log.
//!
//! Used when the process runs without lamp hardware (a desktop or a container
//! next to the broker). Color changes are logged at `info`; repeated writes of
//! the same levels are logged at `debug`.

use core::convert::Infallible;

use tracing::{debug, info};

use crate::traits::SignalLights;

/// [`SignalLights`] implementation backed by `tracing`.
#[derive(Debug, Default)]
pub struct LogLights {
    levels: Option<(bool, bool, bool)>,
}

impl LogLights {
    /// Creates log-only lamps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last levels written, if any.
    pub fn levels(&self) -> Option<(bool, bool, bool)> {
        self.levels
    }
}

fn describe(levels: (bool, bool, bool)) -> &'static str {
    match levels {
        (false, false, false) => "off",
        (true, false, false) => "green",
        (false, true, false) => "yellow",
        (false, false, true) => "red",
        _ => "mixed",
    }
}

impl SignalLights for LogLights {
    type Error = Infallible;

    fn set_levels(&mut self, green: bool, yellow: bool, red: bool) -> Result<(), Infallible> {
        let levels = (green, yellow, red);
        if self.levels == Some(levels) {
            debug!(lamp = describe(levels), "signal unchanged");
        } else {
            info!(lamp = describe(levels), green, yellow, red, "signal");
        }
        self.levels = Some(levels);
        Ok(())
    }
}
