//! Inbound UDP listener
//!
//! Reacts to discovery announces and unsolicited status datagrams from the
//! controllers. When a `receivedConfiguration` message completes the
//! convergence barrier, the round is reported upstream through
//! `/configuration_complete`. Lost datagrams are recovered by the periodic
//! nature of every sender; nothing here retries.

use crate::controllers::ControllerRegistry;
use crate::protocol::{parse_datagram, InboundMessage};
use crate::upstream::UpstreamClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub async fn run(
    socket: Arc<UdpSocket>,
    registry: ControllerRegistry,
    upstream: UpstreamClient,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; 1024];
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("listener stopping");
                return;
            }
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, addr)) => handle_datagram(&buf[..len], addr, &registry, &upstream).await,
                    Err(e) => {
                        error!("udp receive error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

async fn handle_datagram(
    data: &[u8],
    addr: SocketAddr,
    registry: &ControllerRegistry,
    upstream: &UpstreamClient,
) {
    match parse_datagram(data) {
        Ok(InboundMessage::Announce { netid }) => {
            registry.observe_announce(netid, addr.ip()).await;
        }
        Ok(InboundMessage::CaptureComplete { netid }) => {
            registry.capture_complete(netid).await;
        }
        Ok(InboundMessage::ReceivedConfiguration { netid }) => {
            if registry.configuration_received(netid).await {
                info!("all controllers ready, reporting configuration complete");
                if let Err(e) = upstream.configuration_complete().await {
                    // visible upstream only as a missing ack; next round re-sends
                    error!("failed to report convergence: {:#}", e);
                }
            }
        }
        // echo of our own discovery broadcast
        Ok(InboundMessage::Discover) => {}
        Err(e) => debug!("ignoring datagram from {}: {}", addr, e),
    }
}
