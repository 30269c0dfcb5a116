/**
 * PHOTORIG SERVER - Cœur de coordination de la flotte de capture
 *
 * RÔLE : point de synchronisation unique pour une flotte non synchronisée
 * (caméras, projecteur, passerelle trigger) joignable uniquement par poll.
 * Assemble les trois groupes d'état partagé : registre de vivacité,
 * catalogue d'options, distribution de configuration (+ drapeau fire).
 *
 * ARCHITECTURE : API REST Axum, un mutex par groupe d'état, aucune
 * persistance externe requise.
 */

mod catalog;
mod config;
mod distribution;
mod fire;
mod http;
mod liveness;
mod models;
mod poll;
mod state;

use crate::config::load_config;
use crate::http::AppState;
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    let cfg = load_config().await;
    println!(
        "[server] heartbeat={}s staleness x{} controller divisor {}",
        cfg.heartbeat_interval, cfg.staleness_multiplier, cfg.controller_divisor
    );

    let addr: SocketAddr = match format!("{}:{}", cfg.host, cfg.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("[server] adresse d'écoute invalide: {e}");
            std::process::exit(1);
        }
    };

    let app = http::build_router(AppState::new(cfg));

    println!("[server] listening on http://{addr}");
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("[server] bind failed: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("[server] serve error: {e}");
        std::process::exit(1);
    }
}
