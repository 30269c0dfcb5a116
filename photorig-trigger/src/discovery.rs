//! Periodic discovery broadcaster
//!
//! Controllers have no stable addressing, so the gateway broadcasts a
//! discovery datagram on a fixed period and lets them announce themselves.
//! Runs independently of the poll cycle.

use crate::protocol::DISCOVER_MESSAGE;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{info, warn};

pub const DISCOVERY_PERIOD: Duration = Duration::from_secs(10);

pub async fn run(socket: Arc<UdpSocket>, port: u16, mut shutdown: watch::Receiver<bool>) {
    let target = (Ipv4Addr::BROADCAST, port);
    let mut interval = tokio::time::interval(DISCOVERY_PERIOD);
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("discovery broadcaster stopping");
                return;
            }
            _ = interval.tick() => {
                if let Err(e) = socket.send_to(DISCOVER_MESSAGE, target).await {
                    warn!("discovery broadcast failed: {}", e);
                }
            }
        }
    }
}
