use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::labor::{EstimationResult, LaborLineItem};

pub const HOURS_PER_WORKDAY: i64 = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_labor_hours: Decimal,
    pub total_labor_cost: Decimal,
    pub total_materials_cost: Decimal,
    pub total_cost: Decimal,
    pub estimated_duration_days: u32,
}

/// Single technician, 8-hour days, one buffer day; never less than one day.
pub fn duration_days(total_labor_hours: Decimal) -> u32 {
    if total_labor_hours <= Decimal::ZERO {
        return 1;
    }
    let full_days = (total_labor_hours / Decimal::from(HOURS_PER_WORKDAY)).floor();
    full_days.to_u32().unwrap_or(u32::MAX - 1).saturating_add(1)
}

pub fn summarize(items: &[LaborLineItem]) -> CostSummary {
    let total_labor_hours: Decimal = items.iter().map(|item| item.estimated_hours).sum();
    let total_labor_cost: Decimal = items.iter().map(|item| item.labor_subtotal).sum();
    let total_materials_cost: Decimal = items.iter().map(|item| item.materials_cost).sum();

    CostSummary {
        total_labor_hours,
        total_labor_cost,
        total_materials_cost,
        total_cost: total_labor_cost + total_materials_cost,
        estimated_duration_days: duration_days(total_labor_hours),
    }
}

impl EstimationResult {
    pub fn from_items(labor_items: Vec<LaborLineItem>) -> Self {
        let summary = summarize(&labor_items);
        Self {
            labor_items,
            total_labor_hours: summary.total_labor_hours,
            total_labor_cost: summary.total_labor_cost,
            total_materials_cost: summary.total_materials_cost,
            total_cost: summary.total_cost,
            estimated_duration_days: summary.estimated_duration_days,
        }
    }
}
