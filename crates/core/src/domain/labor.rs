use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::money::{ensure_amount, ensure_quantity, serialize_currency, serialize_hours};

/// Presentation bucket a labor line is grouped under on a quote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaborItemCategory {
    Installation,
    Configuration,
    Testing,
    Training,
}

impl LaborItemCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Installation => "Installation",
            Self::Configuration => "Configuration",
            Self::Testing => "Testing",
            Self::Training => "Training",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(serialize_with = "serialize_currency")]
    pub cost_per_unit: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub total_cost: Decimal,
}

impl MaterialLine {
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
        cost_per_unit: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            cost_per_unit,
            total_cost: quantity * cost_per_unit,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborLineItem {
    pub line_number: u32,
    pub category: LaborItemCategory,
    pub task_name: String,
    pub description: String,
    pub scope_of_work: String,
    #[serde(serialize_with = "serialize_hours")]
    pub estimated_hours: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub hourly_rate: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub labor_subtotal: Decimal,
    pub quantity: u32,
    pub materials_needed: Vec<MaterialLine>,
    #[serde(serialize_with = "serialize_currency")]
    pub materials_cost: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub total_cost: Decimal,
    pub is_auto_calculated: bool,
    pub is_optional: bool,
}

impl LaborLineItem {
    /// Caller-supplied lines (for example on a document request) must stay within bounds.
    pub fn validate(&self, index: usize) -> Result<(), DomainError> {
        let field = |name: &str| format!("labor_items[{index}].{name}");
        ensure_quantity(&field("quantity"), u64::from(self.quantity))?;
        ensure_amount(&field("estimated_hours"), self.estimated_hours)?;
        ensure_amount(&field("hourly_rate"), self.hourly_rate)?;
        ensure_amount(&field("labor_subtotal"), self.labor_subtotal)?;
        ensure_amount(&field("materials_cost"), self.materials_cost)?;
        ensure_amount(&field("total_cost"), self.total_cost)
    }
}

/// Inputs for one labor line; derived money fields are computed by [`LaborLineDraft::finish`].
#[derive(Clone, Debug)]
pub struct LaborLineDraft {
    pub category: LaborItemCategory,
    pub task_name: String,
    pub description: String,
    pub scope_of_work: String,
    pub estimated_hours: Decimal,
    pub hourly_rate: Decimal,
    pub quantity: u32,
    pub materials_needed: Vec<MaterialLine>,
    pub is_optional: bool,
}

impl LaborLineDraft {
    pub fn finish(self, line_number: u32) -> LaborLineItem {
        let labor_subtotal = self.estimated_hours * self.hourly_rate;
        let materials_cost: Decimal =
            self.materials_needed.iter().map(|material| material.total_cost).sum();

        LaborLineItem {
            line_number,
            category: self.category,
            task_name: self.task_name,
            description: self.description,
            scope_of_work: self.scope_of_work,
            estimated_hours: self.estimated_hours,
            hourly_rate: self.hourly_rate,
            labor_subtotal,
            quantity: self.quantity,
            materials_needed: self.materials_needed,
            materials_cost,
            total_cost: labor_subtotal + materials_cost,
            is_auto_calculated: true,
            is_optional: self.is_optional,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub labor_items: Vec<LaborLineItem>,
    #[serde(serialize_with = "serialize_hours")]
    pub total_labor_hours: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub total_labor_cost: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub total_materials_cost: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub total_cost: Decimal,
    pub estimated_duration_days: u32,
}
