use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::device::normalize_category;
use crate::domain::installation::LaborCategory;

pub type RateOverrides = BTreeMap<LaborCategory, Decimal>;

/// Hourly rate table. Missing entries fall back to the built-in defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaborRates {
    rates: BTreeMap<LaborCategory, Decimal>,
}

impl Default for LaborRates {
    fn default() -> Self {
        Self {
            rates: LaborCategory::ALL
                .into_iter()
                .map(|category| (category, category.default_hourly_rate()))
                .collect(),
        }
    }
}

impl LaborRates {
    pub fn new(rates: BTreeMap<LaborCategory, Decimal>) -> Self {
        Self::default().with_overrides(&rates)
    }

    /// Layered copy; non-positive override values are ignored.
    pub fn with_overrides(&self, overrides: &RateOverrides) -> Self {
        let mut rates = self.rates.clone();
        for (category, rate) in overrides {
            if *rate > Decimal::ZERO {
                rates.insert(*category, *rate);
            }
        }
        Self { rates }
    }

    pub fn rate(&self, category: LaborCategory) -> Decimal {
        self.rates.get(&category).copied().unwrap_or_else(|| category.default_hourly_rate())
    }

    pub fn as_map(&self) -> &BTreeMap<LaborCategory, Decimal> {
        &self.rates
    }
}

/// Rate bucket billed for a device category's installation line.
pub fn rate_category_for(device_category: &str) -> LaborCategory {
    match normalize_category(device_category).as_str() {
        "hub" | "controller" => LaborCategory::Configuration,
        "switch" | "outlet" => LaborCategory::Electrical,
        _ => LaborCategory::Installation,
    }
}
