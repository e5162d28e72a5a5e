//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test doubles for lamps, publisher and transport
//! - `log`: Lamps that only log (no hardware attached)
//! - `gpio`: Lamps on `embedded-hal` output pins (requires `gpio` feature)

pub mod log;
pub mod mock;

#[cfg(feature = "gpio")]
pub mod gpio;

pub use self::log::*;
pub use mock::*;

#[cfg(feature = "gpio")]
pub use gpio::*;
