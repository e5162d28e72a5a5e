//! Parking lot occupancy signal.
//!
//! Subscribes to vehicle detector events, keeps the lot count, drives the
//! three-color signal, republishes the total and serves the dashboard.
//!
//! # Run
//!
//! ```bash
//! MQTT_BROKER=mosquitto-broker WEB_PASSWORD=changeme \
//!     RUST_LOG=parking_signal=debug cargo run --bin parking_signal
//! ```
//!
//! See `parking_signal::config` for every environment variable.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use parking_signal::hal::LogLights;
use parking_signal::services::{
    connection_channel, run_server_with_state, AppState, EventRouter, MqttHandle,
    PeriodicAnnouncer, ReconnectSupervisor, RumqttTransport, SharedOccupancy, WebServerConfig,
};
use parking_signal::sinks::{ActuatorSink, OccupancySink, RepublishSink, ViewerHub};
use parking_signal::{Config, Occupancy, Publisher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = Config::from_env().context("invalid configuration")?;
    info!(
        broker = %config.mqtt.host,
        port = config.mqtt.port,
        events = %config.topics.events,
        total = %config.topics.total,
        "starting parking signal"
    );

    let shutdown = CancellationToken::new();

    // =========================================================================
    // Transport
    // =========================================================================
    let (state_tx, monitor) = connection_channel();
    let (transport, client) = RumqttTransport::new(&config.mqtt);
    let publisher: Arc<dyn Publisher> =
        Arc::new(MqttHandle::new(client, monitor, shutdown.clone()));

    // =========================================================================
    // Occupancy + sinks
    // =========================================================================
    let sinks: Vec<Box<dyn OccupancySink>> = vec![
        Box::new(ActuatorSink::new(LogLights::new())),
        Box::new(RepublishSink::new(
            Arc::clone(&publisher),
            config.topics.total.as_str(),
        )),
    ];
    let occupancy = Arc::new(SharedOccupancy::new(
        Occupancy::new(config.signal.thresholds()),
        sinks,
        ViewerHub::default(),
    ));

    // =========================================================================
    // Services
    // =========================================================================
    let router = Arc::new(EventRouter::new(
        Arc::clone(&occupancy),
        config.topics.events.as_str(),
        config.topics.commands.as_str(),
    ));
    let supervisor = config.topics.subscriptions().into_iter().fold(
        ReconnectSupervisor::new(
            transport,
            &config.reconnect,
            router,
            state_tx,
            shutdown.clone(),
        ),
        |supervisor, topic| supervisor.subscribe(topic),
    );
    let supervisor_task = tokio::spawn(supervisor.run());

    let announcer = PeriodicAnnouncer::new(
        Arc::clone(&occupancy),
        Arc::clone(&publisher),
        config.topics.total.as_str(),
        config.signal.announce_interval(),
    );
    let announcer_task = tokio::spawn(announcer.run(shutdown.clone()));

    let app_state = AppState::new(
        Arc::clone(&occupancy),
        Arc::clone(&publisher),
        config.topics.commands.as_str(),
        &config.web.secret,
    );
    let mut web_task = tokio::spawn(run_server_with_state(
        app_state,
        WebServerConfig::from_config(&config.web),
        shutdown.clone(),
    ));

    // =========================================================================
    // Shutdown
    // =========================================================================
    let web_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("shutting down");
            None
        }
        result = &mut web_task => Some(result),
    };

    shutdown.cancel();
    occupancy.shutdown();

    report_task("announcer", announcer_task.await);
    report_task("supervisor", supervisor_task.await);
    let web_result = match web_result {
        Some(result) => result,
        None => web_task.await,
    };
    match web_result {
        Ok(Err(e)) => error!(error = %e, "dashboard server failed"),
        Err(e) => error!(error = %e, "dashboard task panicked"),
        Ok(Ok(())) => {}
    }

    info!("stopped");
    Ok(())
}

/// Log a background task that did not finish cleanly. Returns whether it did.
fn report_task(task: &str, result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!(task, error = %e, "task panicked");
            false
        }
    }
}
