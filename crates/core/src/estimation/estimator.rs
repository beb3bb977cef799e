use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::device::{display_name, normalize_category, DeviceSelection};
use crate::domain::installation::LaborCategory;
use crate::domain::labor::{
    EstimationResult, LaborItemCategory, LaborLineDraft, LaborLineItem, MaterialLine,
};
use crate::errors::DomainError;
use crate::estimation::narrative;
use crate::estimation::rates::{rate_category_for, LaborRates, RateOverrides};
use crate::estimation::resolver::{ConfigQuery, ConfigurationProvider, ConfigurationResolver};
use crate::money::{ensure_amount, ensure_quantity, MAX_QUANTITY};

const EFFICIENCY_THRESHOLD: u32 = 10;
const EFFICIENCY_CAP_UNITS: u32 = 40;
const TRAINING_THRESHOLD: u32 = 10;
const TRAINING_SCALE_THRESHOLD: u32 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub selections: Vec<DeviceSelection>,
    #[serde(default = "default_include_materials")]
    pub include_materials: bool,
    #[serde(default)]
    pub labor_rates: Option<RateOverrides>,
}

fn default_include_materials() -> bool {
    true
}

impl EstimateRequest {
    /// Rate overrides must be positive and bounded; the positive device
    /// quantities may not exceed [`MAX_QUANTITY`] in total.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (category, rate) in self.labor_rates.iter().flatten() {
            let field = format!("labor_rates.{}", category.as_str());
            if *rate <= Decimal::ZERO {
                return Err(DomainError::out_of_range(field, "must be greater than zero"));
            }
            ensure_amount(&field, *rate)?;
        }

        let total_devices = self
            .selections
            .iter()
            .filter(|selection| selection.quantity > 0)
            .map(|selection| selection.quantity.unsigned_abs())
            .fold(0_u64, u64::saturating_add);
        ensure_quantity("selections.quantity", total_devices)
    }
}

/// 1% less time per unit above ten, saturating at a 40% reduction.
pub fn efficiency_multiplier(quantity: u32) -> Decimal {
    if quantity <= EFFICIENCY_THRESHOLD {
        return Decimal::ONE;
    }
    let discounted_units = (quantity - EFFICIENCY_THRESHOLD).min(EFFICIENCY_CAP_UNITS);
    Decimal::ONE - Decimal::from(discounted_units) * Decimal::new(1, 2)
}

/// Base time for the first unit plus marginal time for the rest, before efficiency.
pub fn raw_hours(first_unit_hours: Decimal, additional_unit_hours: Decimal, quantity: u32) -> Decimal {
    if quantity == 0 {
        return Decimal::ZERO;
    }
    first_unit_hours + additional_unit_hours * Decimal::from(quantity - 1)
}

#[derive(Debug)]
struct CategoryGroup {
    key: String,
    quantity: u64,
    vendor: Option<String>,
    model: Option<String>,
    complexity_type: Option<String>,
}

impl CategoryGroup {
    fn absorb_hints(&mut self, selection: &DeviceSelection) {
        let hints = [
            (&mut self.vendor, &selection.vendor),
            (&mut self.model, &selection.model),
            (&mut self.complexity_type, &selection.complexity_type),
        ];
        for (current, incoming) in hints {
            match (current.as_ref(), incoming) {
                (None, Some(value)) => *current = Some(value.clone()),
                (Some(existing), Some(value)) if !existing.eq_ignore_ascii_case(value) => {
                    debug!(
                        event_name = "estimation.selection.conflicting_hint",
                        category = %self.key,
                        kept = %existing,
                        ignored = %value,
                        "conflicting resolver hint within category; keeping first"
                    );
                }
                _ => {}
            }
        }
    }
}

/// Non-positive selections are dropped; the rest are summed per category in
/// first-appearance order.
fn group_selections(selections: &[DeviceSelection]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for selection in selections {
        if selection.quantity <= 0 {
            continue;
        }
        let key = normalize_category(&selection.category);
        if key.is_empty() {
            continue;
        }
        let quantity = selection.quantity.unsigned_abs();

        match groups.iter_mut().find(|group| group.key == key) {
            Some(group) => {
                group.quantity = group.quantity.saturating_add(quantity);
                group.absorb_hints(selection);
            }
            None => groups.push(CategoryGroup {
                key,
                quantity,
                vendor: selection.vendor.clone(),
                model: selection.model.clone(),
                complexity_type: selection.complexity_type.clone(),
            }),
        }
    }

    groups
}

pub struct LaborEstimator<P> {
    resolver: ConfigurationResolver<P>,
    rates: LaborRates,
}

impl<P> LaborEstimator<P>
where
    P: ConfigurationProvider,
{
    pub fn new(resolver: ConfigurationResolver<P>, rates: LaborRates) -> Self {
        Self { resolver, rates }
    }

    pub fn rates(&self) -> &LaborRates {
        &self.rates
    }

    pub fn estimate_request(&self, request: &EstimateRequest) -> EstimationResult {
        self.estimate(&request.selections, request.include_materials, request.labor_rates.as_ref())
    }

    /// Never fails. Categories whose summed quantity exceeds [`MAX_QUANTITY`]
    /// are estimated at `MAX_QUANTITY`; run [`EstimateRequest::validate`]
    /// first to reject such input instead.
    pub fn estimate(
        &self,
        selections: &[DeviceSelection],
        include_materials: bool,
        rate_overrides: Option<&RateOverrides>,
    ) -> EstimationResult {
        let rates = match rate_overrides {
            Some(overrides) => self.rates.with_overrides(overrides),
            None => self.rates.clone(),
        };

        let groups = group_selections(selections);
        if groups.is_empty() {
            debug!(event_name = "estimation.empty", "no positive device quantities to estimate");
            return EstimationResult::from_items(Vec::new());
        }

        let mut items: Vec<LaborLineItem> = Vec::with_capacity(groups.len() + 3);
        let mut total_devices: u32 = 0;

        for group in &groups {
            let quantity = bounded_quantity(group);
            total_devices = total_devices.saturating_add(quantity);

            let draft = self.device_line(group, quantity, include_materials, &rates);
            items.push(draft.finish(next_line_number(&items)));
        }

        items.push(configuration_line(total_devices, &rates).finish(next_line_number(&items)));
        items.push(testing_line(total_devices, &rates).finish(next_line_number(&items)));
        if total_devices >= TRAINING_THRESHOLD {
            items.push(training_line(total_devices, &rates).finish(next_line_number(&items)));
        }

        let result = EstimationResult::from_items(items);
        info!(
            event_name = "estimation.completed",
            categories = groups.len(),
            total_devices,
            line_items = result.labor_items.len(),
            total_labor_hours = %result.total_labor_hours,
            total_cost = %result.total_cost,
            "labor estimate computed"
        );
        result
    }

    fn device_line(
        &self,
        group: &CategoryGroup,
        quantity: u32,
        include_materials: bool,
        rates: &LaborRates,
    ) -> LaborLineDraft {
        let resolved = self.resolver.resolve(&ConfigQuery {
            category: &group.key,
            vendor: group.vendor.as_deref(),
            model: group.model.as_deref(),
            complexity_type: group.complexity_type.as_deref(),
        });
        debug!(
            event_name = "estimation.config.resolved",
            category = %group.key,
            score = resolved.score,
            source = ?resolved.source,
            "installation config resolved"
        );

        let estimated_hours = raw_hours(
            resolved.config.first_unit_hours,
            resolved.config.additional_unit_hours,
            quantity,
        ) * efficiency_multiplier(quantity);

        let materials_needed = if include_materials {
            let device_count = Decimal::from(quantity);
            self.resolver
                .material_templates(&group.key)
                .into_iter()
                .map(|template| {
                    MaterialLine::new(
                        template.name,
                        template.quantity_per_device * device_count,
                        template.unit,
                        template.cost_per_unit,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        LaborLineDraft {
            category: LaborItemCategory::Installation,
            task_name: format!("{} Installation", display_name(&group.key)),
            description: narrative::device_description(&group.key, quantity, group.vendor.as_deref()),
            scope_of_work: narrative::device_scope_of_work(&group.key, quantity),
            estimated_hours,
            hourly_rate: rates.rate(rate_category_for(&group.key)),
            quantity,
            materials_needed,
            is_optional: false,
        }
    }
}

impl<P> LaborEstimator<P>
where
    P: ConfigurationProvider,
{
    pub fn with_default_rates(resolver: ConfigurationResolver<P>) -> Self {
        Self::new(resolver, LaborRates::default())
    }
}

fn bounded_quantity(group: &CategoryGroup) -> u32 {
    match u32::try_from(group.quantity) {
        Ok(quantity) if quantity <= MAX_QUANTITY => quantity,
        _ => {
            warn!(
                event_name = "estimation.selection.quantity_clamped",
                category = %group.key,
                requested = group.quantity,
                limit = MAX_QUANTITY,
                "category quantity above limit; estimating at the limit"
            );
            MAX_QUANTITY
        }
    }
}

fn next_line_number(items: &[LaborLineItem]) -> u32 {
    u32::try_from(items.len()).unwrap_or(u32::MAX - 1) + 1
}

fn configuration_line(total_devices: u32, rates: &LaborRates) -> LaborLineDraft {
    LaborLineDraft {
        category: LaborItemCategory::Configuration,
        task_name: "System Configuration".to_string(),
        description: format!(
            "Configure automation platform, scenes, and user access for {total_devices} devices"
        ),
        scope_of_work: narrative::configuration_scope(total_devices),
        estimated_hours: Decimal::new(2, 0) + Decimal::from(total_devices) * Decimal::new(5, 2),
        hourly_rate: rates.rate(LaborCategory::Configuration),
        quantity: 1,
        materials_needed: Vec::new(),
        is_optional: false,
    }
}

fn testing_line(total_devices: u32, rates: &LaborRates) -> LaborLineDraft {
    LaborLineDraft {
        category: LaborItemCategory::Testing,
        task_name: "System Testing".to_string(),
        description: format!("Functional and end-to-end testing of {total_devices} devices"),
        scope_of_work: narrative::testing_scope(total_devices),
        estimated_hours: Decimal::ONE + Decimal::from(total_devices) * Decimal::new(10, 2),
        hourly_rate: rates.rate(LaborCategory::Testing),
        quantity: 1,
        materials_needed: Vec::new(),
        is_optional: false,
    }
}

fn training_line(total_devices: u32, rates: &LaborRates) -> LaborLineDraft {
    let extra_devices = total_devices.saturating_sub(TRAINING_SCALE_THRESHOLD);
    LaborLineDraft {
        category: LaborItemCategory::Training,
        task_name: "Owner & Staff Training".to_string(),
        description: "Hands-on training for property staff and residents".to_string(),
        scope_of_work: narrative::training_scope(total_devices),
        estimated_hours: Decimal::new(15, 1) + Decimal::from(extra_devices) * Decimal::new(5, 2),
        hourly_rate: rates.rate(LaborCategory::Training),
        quantity: 1,
        materials_needed: vec![
            MaterialLine::new("Printed system manual", Decimal::ONE, "ea", Decimal::new(15, 0)),
            MaterialLine::new("Quick-reference cards", Decimal::new(5, 0), "ea", Decimal::new(2, 0)),
        ],
        is_optional: true,
    }
}
