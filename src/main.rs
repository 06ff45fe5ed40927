mod camera;
mod config;
mod gps;
mod relay;
mod rpc;
mod vehicle;

use anyhow::{Context, Result};
use camera::V4lEnumerator;
use config::{GatewayConfig, LiveConfig};
use gps::{SerialGps, Sensor};
use relay::{ConnectionConfig, ConnectionEvent, ConnectionManager, RelaySink};
use rpc::{Dispatcher, MethodRegistry};
use std::sync::Arc;
use tokio::sync::watch;
use vehicle::{ControlLoop, LoggingActuator, VehicleState};

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let path = GatewayConfig::resolve_path(std::env::args().skip(1));
    let config = GatewayConfig::load(&path);

    // Initialize tracing
    let level = match &config {
        Ok(c) if c.flag("debug") || c.flag("verbose") => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!("(FATAL) {:#}", e);
        std::process::exit(2);
    }
}

async fn run(config: GatewayConfig) -> Result<()> {
    info!("Configuration: {:?}", config.live_sections());

    let live_config = LiveConfig::shared(config.live_sections());
    let vehicle = VehicleState::shared();
    let registry = Arc::new(MethodRegistry::standard().context("building method registry")?);
    debug!(
        "Registered methods: {}",
        registry.names().collect::<Vec<_>>().join(", ")
    );

    // Connect to GPS
    let sensor: Option<Arc<dyn Sensor>> = match config.gps_settings() {
        Some(gps) => match SerialGps::connect(&gps.serial, gps.speed) {
            Ok(receiver) => {
                info!("Connected to GPS on {}", receiver.device());
                Some(Arc::new(receiver))
            }
            Err(e) => {
                warn!("Error connecting to GPS on {}: {:#}. Disabling.", gps.serial, e);
                None
            }
        },
        None => {
            info!("No GPS configured");
            None
        }
    };

    let mut conn = ConnectionManager::new(ConnectionConfig::from(&config.relay));
    info!("Edge device starting: {}", conn.device_id());
    info!("  Relay: {}:{}", config.relay.server, config.relay.port);

    if config.rexec.token.is_some() {
        warn!("Remote shell execution (rexec) is ENABLED for token holders");
    }
    let dispatcher = Arc::new(
        Dispatcher::new(
            registry,
            vehicle.clone(),
            live_config.clone(),
            Arc::new(LoggingActuator),
        )
        .with_cameras(Arc::new(V4lEnumerator::default()))
        .with_rexec(config.rexec.clone()),
    );

    // Ctrl-C stops the control loop and the event loop
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let interrupt_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, stopping"),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        let _ = interrupt_tx.send(true);
    });

    let control = ControlLoop::new(
        conn.device_id(),
        vehicle.clone(),
        live_config.clone(),
        sensor,
        Arc::new(conn.handle()),
    );
    let control_task = tokio::spawn(control.run(shutdown_rx.clone()));
    let relay = conn.handle();

    // Main event loop
    loop {
        tokio::select! {
            event = conn.recv() => match event {
                Some(ConnectionEvent::Connected { address }) => {
                    info!("Device attached to relay {}", address);
                }
                Some(ConnectionEvent::Disconnected { reason }) => {
                    warn!("Disconnected: {}", reason);
                }
                Some(ConnectionEvent::ConnectionFailed { reason }) => {
                    error!("Connection failed: {}", reason);
                }
                Some(ConnectionEvent::Received(frame)) => {
                    let dispatcher = dispatcher.clone();
                    let relay = relay.clone();
                    tokio::spawn(async move {
                        let reply = dispatcher.handle(&frame).await;
                        debug!("Reply: {}", reply);
                        if let Err(e) = relay.send(reply.into()).await {
                            error!("Failed to send reply: {}", e);
                        }
                    });
                }
                None => {
                    error!("Connection manager closed");
                    break;
                }
            },
            _ = shutdown_rx.changed() => break,
        }
    }

    let _ = shutdown_tx.send(true);
    control_task.await.context("control loop task")??;
    info!("Vehicle state: {}", vehicle.run_state().await);
    Ok(())
}
