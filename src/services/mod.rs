//! Runtime services around the occupancy core.
//!
//! - `shared`: the lock-owning occupancy state every service holds
//! - `supervisor`: keeps the broker session alive with backoff
//! - `router`: maps inbound topics to commands, forwards dashboard actions
//! - `announcer`: periodic re-publish of the count
//! - `api`: JSON wire types for the dashboard
//! - `mqtt` feature: `rumqttc` transport and publisher
//! - `web` feature: Axum dashboard server
//!
//! # Wiring
//!
//! ```ignore
//! use std::sync::Arc;
//! use parking_signal::services::*;
//!
//! let (state_tx, monitor) = connection_channel();
//! let (transport, client) = RumqttTransport::new(&config.mqtt);
//! let publisher: Arc<dyn Publisher> = Arc::new(MqttHandle::new(client, monitor, shutdown.clone()));
//!
//! let occupancy = Arc::new(SharedOccupancy::new(occupancy, sinks, viewers));
//! let router = Arc::new(EventRouter::new(Arc::clone(&occupancy), events, commands));
//!
//! tokio::spawn(ReconnectSupervisor::new(transport, &config.reconnect, router, state_tx, shutdown.clone()).run());
//! ```

pub mod announcer;
pub mod api;
pub mod router;
pub mod shared;
pub mod supervisor;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "web")]
pub mod web;

// Re-exports
pub use announcer::*;
pub use api::*;
pub use router::*;
pub use shared::*;
pub use supervisor::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;

#[cfg(feature = "web")]
pub use web::*;
