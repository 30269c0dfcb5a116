/**
 * RÉPONDEUR DE POLL - Chaîne de directives ordonnée
 *
 * RÔLE : décide la prochaine action d'un appareil à chaque poll.
 * Chaque directive est une fonction pure sur l'état courant; elles sont
 * évaluées en ordre de priorité fixe et la première qui s'applique gagne :
 *   1. l'appareil (caméra) n'a jamais rapporté ses options -> update_options
 *   2. une configuration est en attente pour lui -> configuration
 *   3. (contrôleur) le drapeau fire est armé -> fire, consommé au passage
 *   4. sinon -> simple intervalle de heartbeat
 */

use crate::catalog::OptionsCatalog;
use crate::config::RigConfig;
use crate::distribution::DistributionState;
use crate::fire::FireFlag;
use crate::models::{DeviceRole, PollRequest, PollResponse};

pub struct PollContext<'a> {
    pub cfg: &'a RigConfig,
    pub catalog: &'a OptionsCatalog,
    pub distribution: &'a DistributionState,
    pub fire: &'a FireFlag,
}

type Directive = fn(&PollContext<'_>, &PollRequest) -> Option<PollResponse>;

const DIRECTIVES: &[Directive] = &[needs_options, pending_configuration, pending_fire];

pub fn respond(ctx: &PollContext, req: &PollRequest) -> PollResponse {
    for directive in DIRECTIVES {
        if let Some(response) = directive(ctx, req) {
            return response;
        }
    }
    PollResponse {
        heartbeat_interval: ctx.cfg.interval_for(req.role),
        ..PollResponse::default()
    }
}

/// Une caméra qui n'a jamais rapporté doit d'abord envoyer ses options,
/// avant toute poussée de configuration.
fn needs_options(ctx: &PollContext, req: &PollRequest) -> Option<PollResponse> {
    if req.role == DeviceRole::Camera && !ctx.catalog.has_reported(&req.serial) {
        return Some(PollResponse {
            heartbeat_interval: ctx.cfg.interval_for(req.role),
            update_options: Some(true),
            ..PollResponse::default()
        });
    }
    None
}

/// L'acquittement n'est jamais déduit de cette réponse : l'appareil doit
/// notifier /configuration_complete séparément.
fn pending_configuration(ctx: &PollContext, req: &PollRequest) -> Option<PollResponse> {
    ctx.distribution.pending_for(&req.serial).map(|payload| PollResponse {
        heartbeat_interval: ctx.cfg.interval_for(req.role),
        configuration: Some(payload),
        ..PollResponse::default()
    })
}

/// Livraison au-plus-une-fois : la consommation est un échange atomique,
/// le premier contrôleur pollant depuis l'armement emporte l'événement.
fn pending_fire(ctx: &PollContext, req: &PollRequest) -> Option<PollResponse> {
    if req.role == DeviceRole::Controller && ctx.fire.consume() {
        return Some(PollResponse {
            heartbeat_interval: ctx.cfg.interval_for(req.role),
            fire: Some(true),
            ..PollResponse::default()
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        cfg: RigConfig,
        catalog: OptionsCatalog,
        distribution: DistributionState,
        fire: FireFlag,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cfg: RigConfig::default(),
                catalog: OptionsCatalog::new(),
                distribution: DistributionState::new(),
                fire: FireFlag::new(),
            }
        }

        fn ctx(&self) -> PollContext<'_> {
            PollContext {
                cfg: &self.cfg,
                catalog: &self.catalog,
                distribution: &self.distribution,
                fire: &self.fire,
            }
        }
    }

    fn poll(serial: &str, role: DeviceRole) -> PollRequest {
        PollRequest { serial: serial.to_string(), role, controllers: None }
    }

    #[test]
    fn test_unreported_camera_asked_for_options_before_configuration() {
        let fx = Fixture::new();
        // configuration déjà en attente pour cam1, mais cam1 n'a pas rapporté
        fx.distribution.assign(json!({"iso": "100"}), &["cam1".to_string()]);

        let resp = respond(&fx.ctx(), &poll("cam1", DeviceRole::Camera));
        assert_eq!(resp.update_options, Some(true));
        assert!(resp.configuration.is_none());
    }

    #[test]
    fn test_reported_camera_receives_pending_configuration() {
        let fx = Fixture::new();
        fx.catalog.report("cam1", Default::default());
        fx.distribution.assign(json!({"iso": "100"}), &["cam1".to_string()]);

        let resp = respond(&fx.ctx(), &poll("cam1", DeviceRole::Camera));
        assert_eq!(resp.configuration, Some(json!({"iso": "100"})));
        assert!(resp.update_options.is_none());

        // après acquittement, plus rien à pousser
        fx.distribution.ack("cam1");
        let resp = respond(&fx.ctx(), &poll("cam1", DeviceRole::Camera));
        assert!(resp.configuration.is_none());
    }

    #[test]
    fn test_fire_delivered_to_first_controller_only() {
        let fx = Fixture::new();
        fx.fire.arm();

        let resp = respond(&fx.ctx(), &poll("trig1", DeviceRole::Controller));
        assert_eq!(resp.fire, Some(true));
        assert_eq!(resp.heartbeat_interval, 0.1);

        let resp = respond(&fx.ctx(), &poll("trig2", DeviceRole::Controller));
        assert!(resp.fire.is_none());
    }

    #[test]
    fn test_fire_not_delivered_to_cameras() {
        let fx = Fixture::new();
        fx.catalog.report("cam1", Default::default());
        fx.fire.arm();

        let resp = respond(&fx.ctx(), &poll("cam1", DeviceRole::Camera));
        assert!(resp.fire.is_none());
        // le drapeau reste armé pour un vrai contrôleur
        let resp = respond(&fx.ctx(), &poll("trig1", DeviceRole::Controller));
        assert_eq!(resp.fire, Some(true));
    }

    #[test]
    fn test_default_response_carries_role_interval() {
        let fx = Fixture::new();
        let resp = respond(&fx.ctx(), &poll("proj", DeviceRole::Projector));
        assert_eq!(resp.heartbeat_interval, 1.0);
        assert!(resp.update_options.is_none());
        assert!(resp.configuration.is_none());
        assert!(resp.fire.is_none());
    }

    #[test]
    fn test_pending_configuration_beats_fire_for_controllers() {
        let fx = Fixture::new();
        fx.distribution.assign(json!({"flash_power": 80}), &["trig1".to_string()]);
        fx.fire.arm();

        let resp = respond(&fx.ctx(), &poll("trig1", DeviceRole::Controller));
        assert!(resp.configuration.is_some());
        assert!(resp.fire.is_none());
        // fire non consommé : toujours livrable au poll suivant
        fx.distribution.ack("trig1");
        let resp = respond(&fx.ctx(), &poll("trig1", DeviceRole::Controller));
        assert_eq!(resp.fire, Some(true));
    }
}
