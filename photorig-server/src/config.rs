use crate::models::DeviceRole;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::Duration;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RigConfig {
    pub host: String,
    pub port: u16,
    /// Intervalle de heartbeat de base, en secondes.
    pub heartbeat_interval: f64,
    /// Fenêtre de péremption = heartbeat_interval * multiplicateur (1.5–3.0).
    pub staleness_multiplier: f64,
    /// Les contrôleurs pollent à heartbeat_interval / diviseur.
    pub controller_divisor: f64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            heartbeat_interval: 1.0,
            staleness_multiplier: 3.0,
            controller_divisor: 10.0,
        }
    }
}

impl RigConfig {
    /// Fenêtre au-delà de laquelle un appareil sans poll est considéré hors ligne.
    pub fn staleness_window(&self) -> Duration {
        Duration::seconds_f64(self.heartbeat_interval * self.staleness_multiplier)
    }

    /// Intervalle de poll selon le rôle : les contrôleurs pollent plus vite
    /// pour capter les événements fire au plus tôt.
    pub fn interval_for(&self, role: DeviceRole) -> f64 {
        match role {
            DeviceRole::Controller => self.heartbeat_interval / self.controller_divisor,
            _ => self.heartbeat_interval,
        }
    }
}

pub async fn load_config() -> RigConfig {
    let path = std::env::var("PHOTORIG_CONFIG").unwrap_or_else(|_| "photorig.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() { return RigConfig::default(); }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[server] config invalide: {e}");
            RigConfig::default()
        })
    } else {
        eprintln!("[server] pas de photorig.yaml, usage config par défaut");
        RigConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_per_role() {
        let cfg = RigConfig::default();
        assert_eq!(cfg.interval_for(DeviceRole::Camera), 1.0);
        assert_eq!(cfg.interval_for(DeviceRole::Projector), 1.0);
        assert_eq!(cfg.interval_for(DeviceRole::Controller), 0.1);
    }

    #[test]
    fn test_staleness_window() {
        let cfg = RigConfig { heartbeat_interval: 2.0, staleness_multiplier: 1.5, ..RigConfig::default() };
        assert_eq!(cfg.staleness_window(), Duration::seconds_f64(3.0));
    }
}
