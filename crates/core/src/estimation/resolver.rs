//! Installation-config resolution.
//!
//! Providers are composed by fallback chaining: a store-backed
//! [`InstallationRuleSet`] is consulted first and [`StaticDefaults`] answers
//! for any category the store does not cover. The resolver applies the
//! complexity multiplier and always yields exactly one config.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::device::normalize_category;
use crate::domain::installation::{InstallationConfig, MaterialRequirement};
use crate::estimation::defaults::StaticDefaults;

pub const SCORE_EXACT: u8 = 100;
pub const SCORE_VENDOR_MODEL: u8 = 80;
pub const SCORE_VENDOR_COMPLEXITY: u8 = 70;
pub const SCORE_COMPLEXITY_ONLY: u8 = 60;
pub const SCORE_VENDOR_ONLY: u8 = 50;
pub const SCORE_GENERIC: u8 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigQuery<'a> {
    pub category: &'a str,
    pub vendor: Option<&'a str>,
    pub model: Option<&'a str>,
    pub complexity_type: Option<&'a str>,
}

impl<'a> ConfigQuery<'a> {
    pub fn category(category: &'a str) -> Self {
        Self { category, ..Self::default() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    RuleSet,
    StaticDefault,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedInstallation {
    /// Config with the complexity multiplier already applied to both hour figures.
    pub config: InstallationConfig,
    pub score: u8,
    pub source: ConfigSource,
}

pub trait ConfigurationProvider: Send + Sync {
    /// Best match for the query, or `None` when this provider has nothing for the category.
    fn resolve(&self, query: &ConfigQuery<'_>) -> Option<ResolvedInstallation>;

    fn material_templates(&self, category: &str) -> Option<Vec<MaterialRequirement>>;
}

impl<P> ConfigurationProvider for std::sync::Arc<P>
where
    P: ConfigurationProvider + ?Sized,
{
    fn resolve(&self, query: &ConfigQuery<'_>) -> Option<ResolvedInstallation> {
        (**self).resolve(query)
    }

    fn material_templates(&self, category: &str) -> Option<Vec<MaterialRequirement>> {
        (**self).material_templates(category)
    }
}

/// Specificity of `candidate` for `query`. Rules are checked top-down and the
/// first that qualifies wins; `0` means the candidate does not apply.
pub fn specificity_score(candidate: &InstallationConfig, query: &ConfigQuery<'_>) -> u8 {
    let vendor = matches(query.vendor, candidate.vendor.as_deref());
    let model = matches(query.model, candidate.model.as_deref());
    let complexity = matches(query.complexity_type, candidate.complexity_type.as_deref());

    if vendor && model && complexity {
        SCORE_EXACT
    } else if vendor && model {
        SCORE_VENDOR_MODEL
    } else if vendor && complexity {
        SCORE_VENDOR_COMPLEXITY
    } else if complexity && candidate.vendor.is_none() && candidate.model.is_none() {
        SCORE_COMPLEXITY_ONLY
    } else if vendor && candidate.model.is_none() && candidate.complexity_type.is_none() {
        SCORE_VENDOR_ONLY
    } else if candidate.is_generic() {
        SCORE_GENERIC
    } else {
        0
    }
}

fn matches(query: Option<&str>, candidate: Option<&str>) -> bool {
    match (query, candidate) {
        (Some(query), Some(candidate)) => {
            query.trim().eq_ignore_ascii_case(candidate.trim())
        }
        _ => false,
    }
}

/// Immutable snapshot of store-backed installation rules and material templates.
///
/// Built once through an explicit load step and shared read-only between
/// estimation runs; a reload produces a new snapshot.
#[derive(Clone, Debug, Default)]
pub struct InstallationRuleSet {
    configs: HashMap<String, Vec<InstallationConfig>>,
    materials: HashMap<String, Vec<MaterialRequirement>>,
}

impl InstallationRuleSet {
    pub fn new(
        configs: Vec<InstallationConfig>,
        materials: Vec<(String, MaterialRequirement)>,
    ) -> Self {
        let mut by_category: HashMap<String, Vec<InstallationConfig>> = HashMap::new();
        for config in configs {
            by_category.entry(normalize_category(&config.category)).or_default().push(config);
        }

        let mut materials_by_category: HashMap<String, Vec<MaterialRequirement>> = HashMap::new();
        for (category, material) in materials {
            materials_by_category.entry(normalize_category(&category)).or_default().push(material);
        }

        Self { configs: by_category, materials: materials_by_category }
    }

    pub fn config_count(&self) -> usize {
        self.configs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty() && self.materials.is_empty()
    }
}

impl ConfigurationProvider for InstallationRuleSet {
    fn resolve(&self, query: &ConfigQuery<'_>) -> Option<ResolvedInstallation> {
        let candidates = self.configs.get(&normalize_category(query.category))?;

        let mut best: Option<(&InstallationConfig, u8)> = None;
        for candidate in candidates {
            let score = specificity_score(candidate, query);
            if score == 0 {
                continue;
            }
            // Strictly greater keeps the first-registered config on ties.
            if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
                best = Some((candidate, score));
            }
        }

        best.map(|(config, score)| ResolvedInstallation {
            config: config.with_multiplier_applied(),
            score,
            source: ConfigSource::RuleSet,
        })
    }

    fn material_templates(&self, category: &str) -> Option<Vec<MaterialRequirement>> {
        self.materials.get(&normalize_category(category)).cloned()
    }
}

/// Consults `primary` first and `fallback` only when `primary` has no answer.
#[derive(Clone, Debug)]
pub struct FallbackProvider<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackProvider<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P, F> ConfigurationProvider for FallbackProvider<P, F>
where
    P: ConfigurationProvider,
    F: ConfigurationProvider,
{
    fn resolve(&self, query: &ConfigQuery<'_>) -> Option<ResolvedInstallation> {
        self.primary.resolve(query).or_else(|| self.fallback.resolve(query))
    }

    fn material_templates(&self, category: &str) -> Option<Vec<MaterialRequirement>> {
        self.primary
            .material_templates(category)
            .filter(|templates| !templates.is_empty())
            .or_else(|| self.fallback.material_templates(category))
    }
}

pub struct ConfigurationResolver<P> {
    provider: P,
}

impl<P> ConfigurationResolver<P>
where
    P: ConfigurationProvider,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn resolve(&self, query: &ConfigQuery<'_>) -> ResolvedInstallation {
        self.provider.resolve(query).unwrap_or_else(|| StaticDefaults.resolve_or_generic(query))
    }

    pub fn material_templates(&self, category: &str) -> Vec<MaterialRequirement> {
        self.provider.material_templates(category).unwrap_or_default()
    }
}

impl ConfigurationResolver<FallbackProvider<InstallationRuleSet, StaticDefaults>> {
    pub fn with_rule_set(rule_set: InstallationRuleSet) -> Self {
        Self::new(FallbackProvider::new(rule_set, StaticDefaults))
    }
}

impl Default for ConfigurationResolver<StaticDefaults> {
    fn default() -> Self {
        Self::new(StaticDefaults)
    }
}
