//! HTTP client toward the photorig coordination server
//!
//! The gateway is just another polling device from the server's point of
//! view: it reports as role "controller", attaches its opaque controller
//! status summary, and receives directives in the poll response.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Poll request body (matches the server's POST /heartbeat contract).
#[derive(Debug, Serialize)]
struct HeartbeatRequest<'a> {
    serial: &'a str,
    #[serde(rename = "type")]
    role: &'static str,
    controllers: &'a HashMap<String, String>,
}

/// Poll response (matches the server's PollResponse contract).
#[derive(Debug, Deserialize)]
pub struct HeartbeatResponse {
    pub heartbeat_interval: f64,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
    #[serde(default)]
    pub fire: Option<bool>,
}

#[derive(Debug, Serialize)]
struct AckRequest<'a> {
    serial: &'a str,
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    server: String,
    serial: String,
}

impl UpstreamClient {
    pub fn new(server: &str, serial: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            server: server.trim_end_matches('/').to_string(),
            serial: serial.to_string(),
        }
    }

    /// One poll cycle: liveness + next directive.
    pub async fn poll(&self, controllers: &HashMap<String, String>) -> Result<HeartbeatResponse> {
        let body = HeartbeatRequest { serial: &self.serial, role: "controller", controllers };
        let response = self
            .http
            .post(format!("{}/heartbeat", self.server))
            .json(&body)
            .send()
            .await
            .context("heartbeat request failed")?
            .error_for_status()
            .context("heartbeat rejected by server")?;
        response.json().await.context("malformed heartbeat response")
    }

    /// Convergence notification: all controllers applied the configuration.
    pub async fn configuration_complete(&self) -> Result<()> {
        self.http
            .post(format!("{}/configuration_complete", self.server))
            .json(&AckRequest { serial: &self.serial })
            .send()
            .await
            .context("configuration_complete request failed")?
            .error_for_status()
            .context("configuration_complete rejected by server")?;
        Ok(())
    }
}
