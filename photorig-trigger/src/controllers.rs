//! In-memory registry of discovered shutter/flash controllers
//!
//! Records are created on first announce and live for the process lifetime.
//! Status moves through {unknown, configuring, ready, firing}; out-of-order
//! messages (status for an unknown network id) are ignored rather than
//! treated as errors. The registry also owns the convergence barrier: the
//! upstream "configuration complete" notification must fire exactly once
//! per configuration round, on the transition into "all ready".

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    Unknown,
    Configuring,
    Ready,
    Firing,
}

impl ControllerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerStatus::Unknown => "unknown",
            ControllerStatus::Configuring => "configuring",
            ControllerStatus::Ready => "ready",
            ControllerStatus::Firing => "firing",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerRecord {
    pub ip: IpAddr,
    pub status: ControllerStatus,
}

#[derive(Default)]
struct RegistryState {
    controllers: HashMap<u8, ControllerRecord>,
    /// True once the current configuration round has been reported upstream.
    convergence_notified: bool,
}

/// Shared between the UDP listener (writes status), the discovery
/// broadcaster (reads nothing) and the poll loop (reads, writes status on
/// configure/fire).
#[derive(Clone)]
pub struct ControllerRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(RegistryState::default())) }
    }

    /// Create the record on first sight; re-announces are no-ops.
    pub async fn observe_announce(&self, netid: u8, ip: IpAddr) {
        let mut state = self.inner.lock().await;
        if !state.controllers.contains_key(&netid) {
            info!("discovered controller {} at {}", netid, ip);
            state
                .controllers
                .insert(netid, ControllerRecord { ip, status: ControllerStatus::Unknown });
        }
    }

    /// A controller finished a capture and is ready for the next command.
    pub async fn capture_complete(&self, netid: u8) {
        let mut state = self.inner.lock().await;
        match state.controllers.get_mut(&netid) {
            Some(record) => record.status = ControllerStatus::Ready,
            None => warn!("captureComplete from unknown controller {}", netid),
        }
    }

    /// A controller applied its configuration command. Returns true exactly
    /// when this message completes the barrier: every known controller is
    /// ready and the current round has not been reported yet.
    pub async fn configuration_received(&self, netid: u8) -> bool {
        let mut state = self.inner.lock().await;
        match state.controllers.get_mut(&netid) {
            Some(record) => record.status = ControllerStatus::Ready,
            None => {
                warn!("receivedConfiguration from unknown controller {}", netid);
                return false;
            }
        }
        let all_ready = state
            .controllers
            .values()
            .all(|record| record.status == ControllerStatus::Ready);
        if all_ready && !state.convergence_notified {
            state.convergence_notified = true;
            debug!("all {} controller(s) converged to ready", state.controllers.len());
            return true;
        }
        false
    }

    /// Start a configuration round: every known controller goes to
    /// `configuring`, the barrier re-arms, and the caller gets the
    /// netid -> ip snapshot to send commands to.
    pub async fn begin_configuration(&self) -> Vec<(u8, IpAddr)> {
        let mut state = self.inner.lock().await;
        state.convergence_notified = false;
        state
            .controllers
            .iter_mut()
            .map(|(netid, record)| {
                record.status = ControllerStatus::Configuring;
                (*netid, record.ip)
            })
            .collect()
    }

    /// Fire has no ack sub-protocol: everyone is marked firing at send time.
    pub async fn mark_all_firing(&self) {
        let mut state = self.inner.lock().await;
        for record in state.controllers.values_mut() {
            record.status = ControllerStatus::Firing;
        }
    }

    /// Opaque status summary sent upstream in our own poll.
    pub async fn status_map(&self) -> HashMap<String, String> {
        let state = self.inner.lock().await;
        state
            .controllers
            .iter()
            .map(|(netid, record)| (netid.to_string(), record.status.as_str().to_string()))
            .collect()
    }
}
