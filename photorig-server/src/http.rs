/**
 * API REST PHOTORIG - Point de synchronisation unique de la flotte
 *
 * RÔLE :
 * Ce module expose l'endpoint de poll que chaque appareil interroge, plus
 * la surface d'administration (push de configuration, fire, observabilité).
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, une poignée de routes par fonction de coordination
 * - POST /heartbeat : vivacité + chaîne de directives (poll.rs)
 * - POST /capture/configure[_all] : affectation de configuration
 * - POST /configuration_complete : acquittement explicite des appareils
 * - POST /camera/options : rapport de capacités -> catalogue
 * - GET  /heartbeat, /options, /capture/configure : vues d'observabilité
 *
 * Aucune réponse n'est une erreur pour une requête bien formée; seule une
 * identité manquante ou un rôle inconnu est rejeté.
 */

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::catalog::OptionsCatalog;
use crate::config::RigConfig;
use crate::distribution::DistributionState;
use crate::fire::FireFlag;
use crate::liveness::LivenessRegistry;
use crate::models::{AckRequest, OptionsReport, PollRequest, PollResponse, Schema};
use crate::poll::{self, PollContext};

#[derive(Clone)]
pub struct AppState {
    pub cfg: RigConfig,
    pub liveness: LivenessRegistry,
    pub catalog: OptionsCatalog,
    pub distribution: DistributionState,
    pub fire: FireFlag,
}

impl AppState {
    pub fn new(cfg: RigConfig) -> Self {
        Self {
            cfg,
            liveness: LivenessRegistry::new(),
            catalog: OptionsCatalog::new(),
            distribution: DistributionState::new(),
            fire: FireFlag::new(),
        }
    }

    fn poll_ctx(&self) -> PollContext<'_> {
        PollContext {
            cfg: &self.cfg,
            catalog: &self.catalog,
            distribution: &self.distribution,
            fire: &self.fire,
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/heartbeat", post(post_heartbeat).get(get_heartbeat))
        .route("/fire", post(post_fire))
        .route("/configuration_complete", post(post_configuration_complete))
        .route("/camera/options", post(post_camera_options))
        .route("/options", get(get_options))
        .route("/capture/configure", post(post_configure).get(get_configure))
        .route("/capture/configure_all", post(post_configure_all).get(get_configure))
        .with_state(app_state)
}

// POST /heartbeat (poll d'un appareil)
async fn post_heartbeat(
    State(app): State<AppState>,
    Json(req): Json<PollRequest>,
) -> Result<Json<PollResponse>, StatusCode> {
    if req.serial.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    app.liveness.touch(&req.serial);
    Ok(Json(poll::respond(&app.poll_ctx(), &req)))
}

// GET /heartbeat (liste des appareils vivants)
async fn get_heartbeat(State(app): State<AppState>) -> Json<Value> {
    let devices = app.liveness.alive_set(app.cfg.staleness_window());
    Json(json!({ "devices": devices }))
}

// POST /fire (armement du déclenchement)
async fn post_fire(State(app): State<AppState>) -> Json<Value> {
    app.fire.arm();
    println!("[capture] fire armed");
    Json(json!({ "success": true }))
}

// POST /configuration_complete (acquittement, idempotent)
async fn post_configuration_complete(
    State(app): State<AppState>,
    Json(req): Json<AckRequest>,
) -> Json<Value> {
    app.distribution.ack(&req.serial);
    println!("[capture] configuration acknowledged by {}", req.serial);
    Json(json!({ "success": true }))
}

// POST /camera/options (rapport de capacités -> fusion rétrécissante)
async fn post_camera_options(
    State(app): State<AppState>,
    Json(report): Json<OptionsReport>,
) -> Json<Value> {
    app.catalog.report(&report.serial, report.options);
    println!("[catalog] options reported by {}", report.serial);
    Json(json!({ "success": true }))
}

// GET /options (catalogue courant, vide si non amorcé)
async fn get_options(State(app): State<AppState>) -> Json<Schema> {
    Json(app.catalog.snapshot())
}

// POST /capture/configure (même charge pour le snapshot des vivants)
async fn post_configure(State(app): State<AppState>, Json(payload): Json<Value>) -> Json<Value> {
    let targets = app.liveness.alive_set(app.cfg.staleness_window());
    app.distribution.assign(payload, &targets);
    let number_configured = app.distribution.unacknowledged_count();
    println!("[capture] configuration assigned to {} device(s)", targets.len());
    Json(json!({ "success": true, "number_configured": number_configured }))
}

// POST /capture/configure_all (map explicite appareil -> charge)
async fn post_configure_all(
    State(app): State<AppState>,
    Json(payloads): Json<HashMap<String, Value>>,
) -> Json<Value> {
    println!("[capture] explicit configuration for {} device(s)", payloads.len());
    app.distribution.assign_explicit(payloads);
    Json(json!({ "success": true }))
}

// GET /capture/configure[_all] (état de l'affectation courante)
async fn get_configure(State(app): State<AppState>) -> Json<Value> {
    match app.distribution.snapshot() {
        Some((configuration, configured)) => {
            Json(json!({ "configuration": configuration, "configured": configured }))
        }
        None => Json(json!({ "success": false })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceRole;

    fn test_state() -> AppState {
        AppState::new(RigConfig::default())
    }

    fn poll_req(serial: &str, role: DeviceRole) -> Json<PollRequest> {
        Json(PollRequest { serial: serial.to_string(), role, controllers: None })
    }

    #[tokio::test]
    async fn test_poll_records_liveness() {
        let app = test_state();
        post_heartbeat(State(app.clone()), poll_req("cam1", DeviceRole::Camera))
            .await
            .unwrap();

        let Json(body) = get_heartbeat(State(app)).await;
        assert_eq!(body["devices"], json!(["cam1"]));
    }

    #[tokio::test]
    async fn test_poll_rejects_empty_serial() {
        let app = test_state();
        let result = post_heartbeat(State(app), poll_req("", DeviceRole::Camera)).await;
        assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_configure_snapshots_alive_set() {
        let app = test_state();
        post_heartbeat(State(app.clone()), poll_req("cam1", DeviceRole::Camera))
            .await
            .unwrap();

        let Json(body) =
            post_configure(State(app.clone()), Json(json!({"iso": "100"}))).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["number_configured"], json!(1));

        // un appareil apparu après l'affectation n'est pas inclus
        post_heartbeat(State(app.clone()), poll_req("cam2", DeviceRole::Camera))
            .await
            .unwrap();
        assert!(app.distribution.pending_for("cam2").is_none());
        assert_eq!(app.distribution.pending_for("cam1"), Some(json!({"iso": "100"})));
    }

    #[tokio::test]
    async fn test_full_configure_ack_cycle() {
        let app = test_state();
        app.catalog.report("cam1", Default::default());
        post_heartbeat(State(app.clone()), poll_req("cam1", DeviceRole::Camera))
            .await
            .unwrap();
        post_configure(State(app.clone()), Json(json!({"iso": "100"}))).await;

        // le poll suivant pousse la configuration
        let Json(resp) = post_heartbeat(State(app.clone()), poll_req("cam1", DeviceRole::Camera))
            .await
            .unwrap();
        assert_eq!(resp.configuration, Some(json!({"iso": "100"})));

        // la directive n'acquitte pas toute seule
        assert_eq!(app.distribution.unacknowledged_count(), 1);

        post_configuration_complete(
            State(app.clone()),
            Json(AckRequest { serial: "cam1".to_string() }),
        )
        .await;
        assert_eq!(app.distribution.unacknowledged_count(), 0);

        let Json(resp) = post_heartbeat(State(app), poll_req("cam1", DeviceRole::Camera))
            .await
            .unwrap();
        assert!(resp.configuration.is_none());
    }

    #[tokio::test]
    async fn test_get_configure_before_and_after_assignment() {
        let app = test_state();
        let Json(body) = get_configure(State(app.clone())).await;
        assert_eq!(body["success"], json!(false));

        let mut payloads = HashMap::new();
        payloads.insert("cam1".to_string(), json!({"iso": "100"}));
        post_configure_all(State(app.clone()), Json(payloads)).await;

        let Json(body) = get_configure(State(app)).await;
        assert_eq!(body["configuration"]["cam1"], json!({"iso": "100"}));
        assert_eq!(body["configured"]["cam1"], json!(false));
    }

    #[tokio::test]
    async fn test_fire_armed_then_consumed_by_controller_poll() {
        let app = test_state();
        post_fire(State(app.clone())).await;

        let Json(resp) = post_heartbeat(State(app.clone()), poll_req("trig1", DeviceRole::Controller))
            .await
            .unwrap();
        assert_eq!(resp.fire, Some(true));

        let Json(resp) = post_heartbeat(State(app), poll_req("trig1", DeviceRole::Controller))
            .await
            .unwrap();
        assert!(resp.fire.is_none());
    }
}
