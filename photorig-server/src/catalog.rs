/**
 * CATALOGUE D'OPTIONS - Capacités communes de la flotte de caméras
 *
 * RÔLE : maintient le schéma de réglages offrable à n'importe quel membre
 * de la flotte. Les firmwares diffèrent légèrement d'un appareil à l'autre;
 * le catalogue converge vers le dénominateur commun par intersection.
 *
 * FONCTIONNEMENT : le premier rapport est stocké tel quel ("seeded").
 * Chaque rapport suivant retire des réglages à choix les valeurs absentes
 * du rapport entrant. La fusion est rétrécissante et limitée aux clés déjà
 * présentes : elle n'ajoute jamais de réglage, et un choix retiré n'est
 * jamais ré-ajouté, même si un appareil l'offre de nouveau plus tard.
 */

use crate::models::Schema;
use crate::state::Bucket;
use std::collections::HashSet;

#[derive(Clone, Default)]
struct CatalogState {
    options: Option<Schema>,
    reported: HashSet<String>,
}

#[derive(Clone)]
pub struct OptionsCatalog {
    inner: Bucket<CatalogState>,
}

impl OptionsCatalog {
    pub fn new() -> Self {
        Self { inner: Bucket::new(CatalogState::default()) }
    }

    /// Intègre le rapport de capacités d'un appareil et le marque comme
    /// ayant rapporté au moins une fois.
    pub fn report(&self, id: &str, schema: Schema) {
        self.inner.write(|st| {
            match &mut st.options {
                None => st.options = Some(schema),
                Some(current) => shrink_choices(current, &schema),
            }
            st.reported.insert(id.to_string());
        });
    }

    pub fn has_reported(&self, id: &str) -> bool {
        self.inner.write(|st| st.reported.contains(id))
    }

    /// Catalogue courant, vide tant qu'aucun appareil n'a rapporté.
    pub fn snapshot(&self) -> Schema {
        self.inner.read().options.unwrap_or_default()
    }
}

/// Retire de chaque réglage à choix déjà au catalogue les valeurs absentes
/// du schéma entrant. Les sections/réglages inconnus du catalogue sont
/// ignorés, ceux absents du rapport entrant sont laissés intacts.
fn shrink_choices(current: &mut Schema, incoming: &Schema) {
    for (section_name, incoming_section) in incoming {
        let Some(section) = current.get_mut(section_name) else { continue };
        for (setting_name, incoming_spec) in incoming_section {
            let Some(spec) = section.get_mut(setting_name) else { continue };
            let Some(choices) = spec.choices.as_mut() else { continue };
            let offered: &[String] = incoming_spec.choices.as_deref().unwrap_or(&[]);
            choices.retain(|c| offered.contains(c));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SettingSpec;

    fn select(name: &str, choices: &[&str]) -> SettingSpec {
        SettingSpec {
            name: name.to_string(),
            kind: "select".to_string(),
            readonly: false,
            value: serde_json::Value::Null,
            range_low: None,
            range_high: None,
            range_inc: None,
            choices: Some(choices.iter().map(|c| c.to_string()).collect()),
        }
    }

    fn schema(choices: &[&str]) -> Schema {
        let mut section = std::collections::HashMap::new();
        section.insert("iso".to_string(), select("iso", choices));
        let mut sections = std::collections::HashMap::new();
        sections.insert("imgsettings".to_string(), section);
        sections
    }

    #[test]
    fn test_first_report_seeds_verbatim() {
        let catalog = OptionsCatalog::new();
        assert!(!catalog.has_reported("cam1"));
        catalog.report("cam1", schema(&["100", "200", "400"]));
        assert!(catalog.has_reported("cam1"));
        let snap = catalog.snapshot();
        assert_eq!(
            snap["imgsettings"]["iso"].choices.as_deref(),
            Some(&["100".to_string(), "200".to_string(), "400".to_string()][..])
        );
    }

    #[test]
    fn test_choices_shrink_only() {
        let catalog = OptionsCatalog::new();
        catalog.report("cam1", schema(&["100", "200", "400"]));
        catalog.report("cam2", schema(&["100", "400"]));
        let snap = catalog.snapshot();
        assert_eq!(
            snap["imgsettings"]["iso"].choices.as_deref(),
            Some(&["100".to_string(), "400".to_string()][..])
        );
        // un choix retiré n'est jamais ré-ajouté
        catalog.report("cam3", schema(&["100", "200", "400"]));
        let snap = catalog.snapshot();
        assert_eq!(
            snap["imgsettings"]["iso"].choices.as_deref(),
            Some(&["100".to_string(), "400".to_string()][..])
        );
    }

    #[test]
    fn test_settings_absent_from_report_left_untouched() {
        let catalog = OptionsCatalog::new();
        catalog.report("cam1", schema(&["100", "200"]));
        // rapport sans la section connue : rien ne bouge
        catalog.report("cam2", Schema::new());
        let snap = catalog.snapshot();
        assert_eq!(
            snap["imgsettings"]["iso"].choices.as_deref(),
            Some(&["100".to_string(), "200".to_string()][..])
        );
    }

    #[test]
    fn test_later_reports_never_add_settings() {
        let catalog = OptionsCatalog::new();
        catalog.report("cam1", schema(&["100"]));
        let mut extra = schema(&["100"]);
        extra
            .get_mut("imgsettings")
            .unwrap()
            .insert("whitebalance".to_string(), select("whitebalance", &["auto"]));
        catalog.report("cam2", extra);
        let snap = catalog.snapshot();
        assert!(!snap["imgsettings"].contains_key("whitebalance"));
    }

    #[test]
    fn test_snapshot_empty_when_unseeded() {
        let catalog = OptionsCatalog::new();
        assert!(catalog.snapshot().is_empty());
    }
}
