//! Trait definitions for hardware and transport abstraction.
//!
//! These are the seams that let the occupancy core run against real brokers
//! and lamps in production and against mocks in tests.
//!
//! # Submodules
//!
//! - `hardware`: the three-lamp signal output
//! - `network`: broker connection, publishing and handler registration
//! - `viewer`: text frames to and from one dashboard viewer
//!
//! # Key Traits
//!
//! - [`SignalLights`]: drives the green/yellow/red outputs
//! - [`Transport`]: one broker session, polled by the reconnect supervisor
//! - [`Publisher`]: connection-gated, non-blocking publish
//! - [`TransportHandler`]: receives inbound messages and connection changes
//! - [`ViewerSocket`]: one live dashboard viewer

pub mod hardware;
pub mod network;
pub mod viewer;

pub use hardware::*;
pub use network::*;
pub use viewer::*;
