/**
 * REGISTRE DE VIVACITÉ - Dernier contact de chaque appareil de la flotte
 *
 * RÔLE : map id d'appareil -> horodatage du dernier poll accepté.
 * Un appareil est "vivant" ssi now - last_seen < fenêtre de péremption.
 *
 * FONCTIONNEMENT : écrit uniquement par l'endpoint heartbeat (touch),
 * lu par la vue GET et par la prise de snapshot de configuration.
 * Aucune éviction : une entrée périmée cesse simplement de compter.
 */

use crate::state::Bucket;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

#[derive(Clone)]
pub struct LivenessRegistry {
    records: Bucket<HashMap<String, OffsetDateTime>>,
}

impl LivenessRegistry {
    pub fn new() -> Self {
        Self { records: Bucket::new(HashMap::new()) }
    }

    /// Enregistre le contact. Toujours un succès (écriture pure).
    pub fn touch(&self, id: &str) {
        self.touch_at(id, OffsetDateTime::now_utc());
    }

    fn touch_at(&self, id: &str, now: OffsetDateTime) {
        self.records.write(|map| {
            map.insert(id.to_string(), now);
        });
    }

    /// Ids de tous les appareils vus dans la fenêtre. Ordre non significatif.
    pub fn alive_set(&self, window: Duration) -> Vec<String> {
        self.alive_at(window, OffsetDateTime::now_utc())
    }

    fn alive_at(&self, window: Duration, now: OffsetDateTime) -> Vec<String> {
        self.records
            .read()
            .into_iter()
            .filter(|(_, seen)| now - *seen < window)
            .map(|(id, _)| id)
            .collect()
    }
}
