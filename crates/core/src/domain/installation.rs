use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::money::ensure_amount;

const MAX_UNIT_HOURS: i64 = 1_000;
const MAX_COMPLEXITY_MULTIPLIER: i64 = 100;
const MAX_MATERIAL_PER_DEVICE: i64 = 1_000;

fn ensure_at_most(field: &str, value: Decimal, limit: i64) -> Result<(), DomainError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::out_of_range(field, "must not be negative"));
    }
    if value > Decimal::from(limit) {
        return Err(DomainError::out_of_range(field, format!("must be at most {limit}")));
    }
    Ok(())
}

/// Billing-rate bucket a task is charged under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaborCategory {
    Installation,
    Configuration,
    Networking,
    Electrical,
    Testing,
    Training,
    ProjectManagement,
}

impl LaborCategory {
    pub const ALL: [LaborCategory; 7] = [
        Self::Installation,
        Self::Configuration,
        Self::Networking,
        Self::Electrical,
        Self::Testing,
        Self::Training,
        Self::ProjectManagement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installation => "installation",
            Self::Configuration => "configuration",
            Self::Networking => "networking",
            Self::Electrical => "electrical",
            Self::Testing => "testing",
            Self::Training => "training",
            Self::ProjectManagement => "project_management",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "installation" => Some(Self::Installation),
            "configuration" => Some(Self::Configuration),
            "networking" => Some(Self::Networking),
            "electrical" => Some(Self::Electrical),
            "testing" => Some(Self::Testing),
            "training" => Some(Self::Training),
            "project_management" => Some(Self::ProjectManagement),
            _ => None,
        }
    }

    /// Built-in hourly rate used when neither the store nor the caller supplies one.
    pub fn default_hourly_rate(&self) -> Decimal {
        match self {
            Self::Installation => Decimal::new(85, 0),
            Self::Configuration => Decimal::new(95, 0),
            Self::Networking => Decimal::new(100, 0),
            Self::Electrical => Decimal::new(110, 0),
            Self::Testing => Decimal::new(75, 0),
            Self::Training => Decimal::new(65, 0),
            Self::ProjectManagement => Decimal::new(125, 0),
        }
    }
}

/// One labor-time rule. Several may exist per category, differing by
/// vendor, model, or complexity tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationConfig {
    pub category: String,
    pub first_unit_hours: Decimal,
    pub additional_unit_hours: Decimal,
    pub labor_category: LaborCategory,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub complexity_type: Option<String>,
    #[serde(default = "default_multiplier")]
    pub complexity_multiplier: Decimal,
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

impl InstallationConfig {
    pub fn generic(
        category: impl Into<String>,
        first_unit_hours: Decimal,
        additional_unit_hours: Decimal,
    ) -> Self {
        Self {
            category: category.into(),
            first_unit_hours,
            additional_unit_hours,
            labor_category: LaborCategory::Installation,
            vendor: None,
            model: None,
            complexity_type: None,
            complexity_multiplier: Decimal::ONE,
        }
    }

    pub fn is_generic(&self) -> bool {
        self.vendor.is_none() && self.model.is_none() && self.complexity_type.is_none()
    }

    /// Stored rules must keep hours and multiplier within sane bounds.
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_at_most("first_unit_hours", self.first_unit_hours, MAX_UNIT_HOURS)?;
        ensure_at_most("additional_unit_hours", self.additional_unit_hours, MAX_UNIT_HOURS)?;
        ensure_at_most("complexity_multiplier", self.complexity_multiplier, MAX_COMPLEXITY_MULTIPLIER)?;
        if self.complexity_multiplier.is_zero() {
            return Err(DomainError::out_of_range("complexity_multiplier", "must be greater than zero"));
        }
        Ok(())
    }

    /// Copy with the complexity multiplier folded into both hour figures.
    pub fn with_multiplier_applied(&self) -> Self {
        let mut applied = self.clone();
        applied.first_unit_hours = self.first_unit_hours * self.complexity_multiplier;
        applied.additional_unit_hours = self.additional_unit_hours * self.complexity_multiplier;
        applied
    }
}

/// Per-device consumable attached to a device category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub name: String,
    pub unit: String,
    pub quantity_per_device: Decimal,
    pub cost_per_unit: Decimal,
}

impl MaterialRequirement {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        quantity_per_device: Decimal,
        cost_per_unit: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            quantity_per_device,
            cost_per_unit,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_at_most("quantity_per_device", self.quantity_per_device, MAX_MATERIAL_PER_DEVICE)?;
        ensure_amount("cost_per_unit", self.cost_per_unit)
    }
}
