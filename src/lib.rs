//! # parking-signal
//!
//! A parking-lot occupancy counter driven by vehicle detector events over
//! MQTT, with a three-color traffic signal and a live dashboard.
//!
//! ## Features
//!
//! - **Event interpretation**: free-form detector text (`car_entry_detected`, `exit`, ...)
//! - **Signal output**: green / yellow / red from configurable thresholds
//! - **Republish**: the count goes back out on a retained topic, plus a periodic announce
//! - **Self-healing transport**: exponential reconnect backoff, resubscribe on every connect
//! - **Dashboard**: state and action endpoints plus live WebSocket viewers
//!
//! ## Architecture
//!
//! The crate is structured to allow testing without a broker or lamps:
//!
//! - `occupancy` - Count, thresholds and color
//! - `commands` - Payload interpretation and dashboard actions
//! - `backoff` - Reconnect delay policy
//! - `traits` - Lamp and transport abstractions
//! - `sinks` - Everything that reacts to a new count
//! - `services` - Shared state, supervisor, router, announcer, MQTT and web
//! - `hal` - Concrete lamps (mock, log, gpio) and test doubles
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_signal::{
//!     interpret, Occupancy, SignalColor,
//!     hal::MockLights,
//!     services::SharedOccupancy,
//!     sinks::{ActuatorSink, ViewerHub},
//! };
//!
//! let lights = MockLights::new();
//! let state = Arc::new(SharedOccupancy::new(
//!     Occupancy::default(),
//!     vec![Box::new(ActuatorSink::new(lights.clone()))],
//!     ViewerHub::default(),
//! ));
//!
//! state.apply(&interpret(b"setfull"));
//! assert_eq!(state.snapshot().color, SignalColor::Red);
//! assert_eq!(lights.levels(), (false, false, true));
//! ```

#![warn(missing_docs)]

/// Reconnect delay policy.
pub mod backoff;
/// Command types, payload interpretation and dashboard actions.
pub mod commands;
/// Environment-driven configuration.
pub mod config;
/// Lamp drivers and test doubles.
pub mod hal;
/// Occupancy count and signal color.
pub mod occupancy;
/// Network services: shared state, supervisor, MQTT and dashboard.
pub mod services;
/// Broadcast sinks invoked on every count change.
pub mod sinks;
/// Core traits for lamp and transport abstraction.
pub mod traits;

// Re-exports for convenience
pub use backoff::Backoff;
pub use commands::{interpret, ApplyOutcome, Command, DashboardAction};
pub use occupancy::{
    Occupancy, OccupancyUpdate, SignalColor, Thresholds, FULL_THRESHOLD, WARN_THRESHOLD,
};
pub use sinks::{ActuatorSink, OccupancySink, RepublishSink, SinkError, ViewerHub};
pub use traits::{
    // Hardware
    SignalLights,
    // Network
    ConnectionState,
    MqttMessage,
    PublishError,
    Publisher,
    Transport,
    TransportError,
    TransportEvent,
    TransportHandler,
    // Dashboard
    ViewerClosed,
    ViewerSocket,
};

// Config re-exports
pub use config::{
    Config, ConfigError, MqttConfig, ReconnectConfig, SignalConfig, TopicConfig, WebConfig,
};
