/**
 * DISTRIBUTION DE CONFIGURATION - Machine d'état par appareil
 *
 * RÔLE : porte, pour le cycle courant, l'ensemble cible et la charge de
 * configuration; suit l'acquittement par appareil (unset -> pending ->
 * acknowledged).
 *
 * FONCTIONNEMENT : une nouvelle affectation remplace toujours la map
 * entière (dernier-assignant-gagnant, pas de fusion avec un envoi en
 * vol). L'acquittement ne passe que de false à true, et uniquement via la
 * notification explicite de l'appareil, jamais via la réponse de poll.
 */

use crate::state::Bucket;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Assignment {
    payload: Value,
    acknowledged: bool,
}

#[derive(Clone)]
pub struct DistributionState {
    // None tant qu'aucune affectation n'a jamais été faite
    inner: Bucket<Option<HashMap<String, Assignment>>>,
}

impl DistributionState {
    pub fn new() -> Self {
        Self { inner: Bucket::new(None) }
    }

    /// Affecte la même charge à l'ensemble cible capturé à l'instant de
    /// l'appel. Les appareils devenant vivants ensuite ne sont pas inclus.
    pub fn assign(&self, payload: Value, targets: &[String]) {
        self.inner.write(|map| {
            *map = Some(
                targets
                    .iter()
                    .map(|id| (id.clone(), Assignment { payload: payload.clone(), acknowledged: false }))
                    .collect(),
            );
        });
    }

    /// Affectation explicite appareil -> charge distincte.
    pub fn assign_explicit(&self, payloads: HashMap<String, Value>) {
        self.inner.write(|map| {
            *map = Some(
                payloads
                    .into_iter()
                    .map(|(id, payload)| (id, Assignment { payload, acknowledged: false }))
                    .collect(),
            );
        });
    }

    /// Acquittement idempotent : no-op pour un id sans affectation en cours.
    pub fn ack(&self, id: &str) {
        self.inner.write(|map| {
            if let Some(entry) = map.as_mut().and_then(|m| m.get_mut(id)) {
                entry.acknowledged = true;
            }
        });
    }

    /// Charge à pousser ssi l'appareil est en attente d'acquittement.
    pub fn pending_for(&self, id: &str) -> Option<Value> {
        self.inner.write(|map| {
            map.as_ref()
                .and_then(|m| m.get(id))
                .filter(|entry| !entry.acknowledged)
                .map(|entry| entry.payload.clone())
        })
    }

    pub fn unacknowledged_count(&self) -> usize {
        self.inner.write(|map| {
            map.as_ref()
                .map(|m| m.values().filter(|e| !e.acknowledged).count())
                .unwrap_or(0)
        })
    }

    /// Vue d'observabilité : (configuration, configured) ou None avant
    /// toute affectation.
    pub fn snapshot(&self) -> Option<(HashMap<String, Value>, HashMap<String, bool>)> {
        self.inner.read().map(|m| {
            let configuration = m.iter().map(|(id, e)| (id.clone(), e.payload.clone())).collect();
            let configured = m.iter().map(|(id, e)| (id.clone(), e.acknowledged)).collect();
            (configuration, configured)
        })
    }
}
