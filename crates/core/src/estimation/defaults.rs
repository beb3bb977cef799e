use rust_decimal::Decimal;

use crate::domain::device::normalize_category;
use crate::domain::installation::{InstallationConfig, MaterialRequirement};
use crate::estimation::resolver::{
    ConfigQuery, ConfigSource, ConfigurationProvider, ResolvedInstallation, SCORE_GENERIC,
};

/// (category, first unit hours x100, additional unit hours x100)
const DEFAULT_HOURS: &[(&str, i64, i64)] = &[
    ("smart_lock", 150, 100),
    ("thermostat", 150, 100),
    ("hub", 100, 50),
    ("camera", 150, 100),
    ("doorbell", 100, 75),
    ("sensor", 50, 25),
    ("switch", 75, 50),
    ("outlet", 50, 35),
    ("garage_door", 150, 100),
    ("shade", 100, 50),
    ("irrigation", 200, 100),
    ("leak_detector", 50, 25),
    ("smoke_detector", 75, 50),
];

const UNKNOWN_CATEGORY_HOURS: (i64, i64) = (100, 50);

/// (category, name, unit, quantity per device x100, cost per unit in cents)
const DEFAULT_MATERIALS: &[(&str, &str, &str, i64, i64)] = &[
    ("smart_lock", "Mounting hardware kit", "set", 100, 850),
    ("smart_lock", "AA lithium batteries", "ea", 400, 175),
    ("thermostat", "18/5 thermostat wire", "ft", 1_000, 45),
    ("thermostat", "Wire nuts", "ea", 400, 15),
    ("thermostat", "Wall trim plate", "ea", 100, 600),
    ("hub", "Cat6 patch cable", "ea", 100, 650),
    ("hub", "Surge protector", "ea", 100, 1_800),
    ("camera", "Cat6 cable", "ft", 5_000, 35),
    ("camera", "RJ45 connectors", "ea", 200, 60),
    ("camera", "Weatherproof junction box", "ea", 100, 1_200),
    ("doorbell", "Doorbell wire", "ft", 1_000, 30),
    ("doorbell", "Mounting wedge kit", "set", 100, 900),
    ("sensor", "Mounting adhesive strips", "set", 100, 250),
    ("sensor", "CR2032 battery", "ea", 100, 125),
    ("switch", "Wire nuts", "ea", 400, 15),
    ("switch", "Decora wall plate", "ea", 100, 350),
    ("outlet", "Wire nuts", "ea", 300, 15),
    ("outlet", "Outlet wall plate", "ea", 100, 275),
    ("garage_door", "Mounting bracket kit", "set", 100, 1_100),
    ("garage_door", "Low-voltage wire", "ft", 2_500, 25),
    ("shade", "Mounting brackets", "set", 100, 750),
    ("irrigation", "Waterproof wire connectors", "ea", 800, 85),
    ("irrigation", "Mounting screws", "set", 100, 200),
    ("leak_detector", "AAA batteries", "ea", 200, 90),
    ("smoke_detector", "Mounting plate", "ea", 100, 400),
    ("smoke_detector", "9V backup battery", "ea", 100, 325),
];

/// Hardcoded per-category tables used when the store has no rule for a category.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticDefaults;

impl StaticDefaults {
    pub fn known_categories() -> impl Iterator<Item = &'static str> {
        DEFAULT_HOURS.iter().map(|(category, _, _)| *category)
    }

    pub fn is_known(category: &str) -> bool {
        let key = normalize_category(category);
        DEFAULT_HOURS.iter().any(|(known, _, _)| *known == key)
    }

    pub fn config_for(category: &str) -> InstallationConfig {
        let key = normalize_category(category);
        let (first, additional) = DEFAULT_HOURS
            .iter()
            .find(|(known, _, _)| *known == key)
            .map(|(_, first, additional)| (*first, *additional))
            .unwrap_or(UNKNOWN_CATEGORY_HOURS);

        InstallationConfig::generic(key, Decimal::new(first, 2), Decimal::new(additional, 2))
    }

    pub fn resolve_or_generic(&self, query: &ConfigQuery<'_>) -> ResolvedInstallation {
        ResolvedInstallation {
            config: Self::config_for(query.category),
            score: SCORE_GENERIC,
            source: ConfigSource::StaticDefault,
        }
    }
}

impl ConfigurationProvider for StaticDefaults {
    fn resolve(&self, query: &ConfigQuery<'_>) -> Option<ResolvedInstallation> {
        Some(self.resolve_or_generic(query))
    }

    fn material_templates(&self, category: &str) -> Option<Vec<MaterialRequirement>> {
        let key = normalize_category(category);
        let templates: Vec<MaterialRequirement> = DEFAULT_MATERIALS
            .iter()
            .filter(|(known, ..)| *known == key)
            .map(|(_, name, unit, quantity, cost)| {
                MaterialRequirement::new(
                    *name,
                    *unit,
                    Decimal::new(*quantity, 2),
                    Decimal::new(*cost, 2),
                )
            })
            .collect();

        (!templates.is_empty()).then_some(templates)
    }
}
