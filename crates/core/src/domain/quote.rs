use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::money::{ensure_amount, ensure_quantity};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Annual,
}

impl BillingPeriod {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Monthly => "/mo",
            Self::Annual => "/yr",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<Decimal>,
    #[serde(default)]
    pub year_built: Option<u32>,
}

impl PropertyMetadata {
    pub fn is_empty(&self) -> bool {
        self.property_name.is_none()
            && self.property_type.is_none()
            && self.square_feet.is_none()
            && self.bedrooms.is_none()
            && self.bathrooms.is_none()
            && self.year_built.is_none()
    }
}

/// A purchasable line on a quote: hardware, subscription tier, or installation fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    pub product_name: String,
    pub category: String,
    #[serde(default)]
    pub domain: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub monthly_rate: Option<Decimal>,
    #[serde(default)]
    pub annual_rate: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

impl QuoteLineItem {
    pub fn is_subscription(&self) -> bool {
        self.category.trim().to_ascii_lowercase().starts_with("subscription_")
    }

    pub fn is_installation(&self) -> bool {
        self.category.trim().eq_ignore_ascii_case("installation")
    }

    pub fn extended_price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Quantity and every price must be within the accepted bounds.
    pub fn validate(&self, index: usize) -> Result<(), DomainError> {
        let field = |name: &str| format!("line_items[{index}].{name}");
        ensure_quantity(&field("quantity"), u64::from(self.quantity))?;
        ensure_amount(&field("unit_price"), self.unit_price)?;
        if let Some(rate) = self.monthly_rate {
            ensure_amount(&field("monthly_rate"), rate)?;
        }
        if let Some(rate) = self.annual_rate {
            ensure_amount(&field("annual_rate"), rate)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePlacement {
    pub room: String,
    pub device: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub title: String,
    pub image_ref: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLink {
    pub title: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoPair {
    pub caption: String,
    pub before_ref: String,
    pub after_ref: String,
}

/// External quote record; read by the document assembler, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub quote_number: String,
    pub customer: CustomerInfo,
    #[serde(default)]
    pub property: Option<PropertyMetadata>,
    #[serde(default)]
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub line_items: Vec<QuoteLineItem>,
    #[serde(default)]
    pub device_placements: Vec<DevicePlacement>,
    #[serde(default)]
    pub floor_plans: Vec<FloorPlan>,
    #[serde(default)]
    pub scans: Vec<ScanLink>,
    #[serde(default)]
    pub photo_pairs: Vec<PhotoPair>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.line_items.iter().enumerate().try_for_each(|(index, item)| item.validate(index))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::QuoteLineItem;
    use crate::errors::DomainError;

    fn line(category: &str) -> QuoteLineItem {
        QuoteLineItem {
            product_name: "Item".to_string(),
            category: category.to_string(),
            domain: None,
            quantity: 3,
            unit_price: Decimal::new(2_500, 2),
            monthly_rate: None,
            annual_rate: None,
            description: None,
        }
    }

    #[test]
    fn classifies_line_kinds_by_category_tag() {
        assert!(line("subscription_premium").is_subscription());
        assert!(line("Installation").is_installation());
        assert!(!line("hardware").is_subscription());
        assert_eq!(line("hardware").extended_price(), Decimal::new(7_500, 2));
    }

    #[test]
    fn oversized_prices_are_rejected_with_their_position() {
        let mut item = line("hardware");
        item.unit_price = Decimal::MAX;

        let error = item.validate(4).expect_err("price too large");
        assert!(matches!(error, DomainError::OutOfRange { ref field, .. } if field == "line_items[4].unit_price"));

        item.unit_price = Decimal::new(2_500, 2);
        item.annual_rate = Some(Decimal::new(-1, 0));
        assert!(item.validate(0).is_err());
    }
}
