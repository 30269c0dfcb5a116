//! Photorig Trigger - Controller fan-out gateway
//!
//! Polls the coordination server as a regular device (role "controller")
//! while privately managing a second tier of shutter/flash microcontrollers
//! over UDP:
//! - Periodic broadcast discovery, controllers announce with a network id
//! - Binary configuration commands fanned out per controller
//! - Broadcast fire with no ack sub-protocol
//! - Convergence barrier: "configuration complete" goes upstream only once
//!   every known controller is ready
//!
//! Three loops run concurrently (poll, discovery broadcast, UDP listener)
//! and share only the in-memory controller registry.

mod controllers;
mod discovery;
mod listener;
mod protocol;
mod upstream;

use anyhow::{Context, Result};
use controllers::ControllerRegistry;
use protocol::{encode_configuration, ShutterConfig, FIRE_MESSAGE};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};
use upstream::UpstreamClient;

/// Gateway configuration
#[derive(Debug, Clone)]
struct GatewayConfig {
    server: String,
    serial: String,
    bind: String,
    udp_port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:5000".to_string(),
            serial: "1".to_string(),
            bind: "0.0.0.0".to_string(),
            udp_port: 11000,
        }
    }
}

impl GatewayConfig {
    fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(server) = std::env::var("PHOTORIG_SERVER") {
            config.server = server;
        }
        if let Ok(serial) = std::env::var("PHOTORIG_SERIAL") {
            config.serial = serial;
        }
        if let Ok(bind) = std::env::var("PHOTORIG_BIND") {
            config.bind = bind;
        }
        if let Ok(port) = std::env::var("PHOTORIG_UDP_PORT") {
            match port.parse() {
                Ok(port) => config.udp_port = port,
                Err(e) => warn!("ignoring invalid PHOTORIG_UDP_PORT: {}", e),
            }
        }
        config
    }
}

struct Gateway {
    config: GatewayConfig,
    registry: ControllerRegistry,
    upstream: UpstreamClient,
    sender: Arc<UdpSocket>,
}

impl Gateway {
    /// Poll loop: one heartbeat per cycle, directives applied in-cycle,
    /// then idle until the server-provided next poll time.
    async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        loop {
            let cycle_start = Instant::now();
            let status = self.registry.status_map().await;
            let interval = match self.upstream.poll(&status).await {
                Ok(response) => {
                    if let Some(payload) = &response.configuration {
                        self.configure(payload).await;
                    }
                    if response.fire == Some(true) {
                        self.fire().await;
                    }
                    response.heartbeat_interval
                }
                Err(e) => {
                    // transient failure: try again next cycle
                    warn!("poll failed: {:#}", e);
                    1.0
                }
            };

            let next_poll = cycle_start + Duration::from_secs_f64(interval.max(0.0));
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("poll loop stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep_until(next_poll) => {}
            }
        }
    }

    /// Fan the configuration command out to every known controller.
    async fn configure(&self, payload: &serde_json::Value) {
        let config = ShutterConfig::from_payload(payload);
        let targets = self.registry.begin_configuration().await;
        info!("configuring {} controller(s)", targets.len());
        for (netid, ip) in targets {
            let command = encode_configuration(netid, &config);
            if let Err(e) = self.sender.send_to(&command, (ip, self.config.udp_port)).await {
                // controller stays in `configuring`; the convergence barrier
                // simply never completes until a later round reaches it
                error!("failed to send configuration to controller {}: {}", netid, e);
            }
        }
    }

    /// Broadcast fire. At-most-once: no ack, no retry.
    async fn fire(&self) {
        self.registry.mark_all_firing().await;
        info!("broadcasting fire");
        if let Err(e) = self
            .sender
            .send_to(FIRE_MESSAGE, (Ipv4Addr::BROADCAST, self.config.udp_port))
            .await
        {
            error!("fire broadcast failed: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env();
    info!(
        "starting trigger gateway (serial {}, server {}, udp port {})",
        config.serial, config.server, config.udp_port
    );

    let listen_socket = UdpSocket::bind((config.bind.as_str(), config.udp_port))
        .await
        .context("failed to bind UDP listen socket")?;
    let send_socket = UdpSocket::bind((config.bind.as_str(), 0))
        .await
        .context("failed to bind UDP send socket")?;
    send_socket
        .set_broadcast(true)
        .context("failed to enable broadcast")?;

    let send_socket = Arc::new(send_socket);
    let registry = ControllerRegistry::new();
    let upstream = UpstreamClient::new(&config.server, &config.serial);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(listener::run(
        Arc::new(listen_socket),
        registry.clone(),
        upstream.clone(),
        shutdown_rx.clone(),
    ));
    tokio::spawn(discovery::run(
        send_socket.clone(),
        config.udp_port,
        shutdown_rx.clone(),
    ));

    let gateway = Gateway {
        config,
        registry,
        upstream,
        sender: send_socket,
    };

    tokio::select! {
        result = gateway.run(shutdown_rx) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    let _ = shutdown_tx.send(true);
    Ok(())
}
