use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rôle d'un appareil de la flotte. Un rôle inconnu est rejeté à la
/// désérialisation : l'appareil doit re-poller avec une identité corrigée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    Camera,
    Controller,
    Projector,
    Other,
}

/// Requête de poll envoyée par chaque appareil (POST /heartbeat).
#[derive(Debug, Deserialize)]
pub struct PollRequest {
    pub serial: String,
    #[serde(rename = "type")]
    pub role: DeviceRole,
    /// Résumé opaque des statuts microcontrôleurs, remonté par la
    /// passerelle trigger dans son propre poll.
    #[serde(default)]
    pub controllers: Option<HashMap<String, String>>,
}

/// Réponse de poll : toujours l'intervalle avant le prochain contact,
/// plus au plus une directive.
#[derive(Debug, Default, Serialize)]
pub struct PollResponse {
    pub heartbeat_interval: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_options: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire: Option<bool>,
}

/// Corps de POST /configuration_complete.
#[derive(Debug, Deserialize)]
pub struct AckRequest {
    pub serial: String,
}

/// Corps de POST /camera/options.
#[derive(Debug, Deserialize)]
pub struct OptionsReport {
    pub serial: String,
    pub options: Schema,
}

/// Schéma de capacités : section -> nom de réglage -> spécification.
pub type Schema = HashMap<String, HashMap<String, SettingSpec>>;

/// Spécification d'un réglage telle que rapportée par un driver d'appareil.
/// Seul `choices` est interprété par le serveur (intersection du catalogue);
/// le reste est conservé tel quel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String, // text, range, toggle, select, date
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_inc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}
