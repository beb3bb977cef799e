use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::serialize_currency;

/// (minimum units, discount percent), highest tier first.
const BULK_TIERS: &[(u32, i64)] = &[(50, 20), (25, 15), (10, 10)];

/// Tiered hardware discount keyed on total unit count across the quote.
pub fn bulk_discount_rate(total_units: u32) -> Decimal {
    BULK_TIERS
        .iter()
        .find(|(minimum, _)| total_units >= *minimum)
        .map(|(_, percent)| Decimal::new(*percent, 2))
        .unwrap_or(Decimal::ZERO)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDiscount {
    pub total_units: u32,
    pub rate: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub amount: Decimal,
}

impl BulkDiscount {
    pub fn for_hardware(total_units: u32, hardware_subtotal: Decimal) -> Option<Self> {
        let rate = bulk_discount_rate(total_units);
        if rate.is_zero() {
            return None;
        }
        Some(Self { total_units, rate, amount: hardware_subtotal * rate })
    }

    pub fn percent(&self) -> Decimal {
        self.rate * Decimal::ONE_HUNDRED
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{bulk_discount_rate, BulkDiscount};

    #[test]
    fn tiers_switch_at_ten_twenty_five_and_fifty_units() {
        assert_eq!(bulk_discount_rate(9), Decimal::ZERO);
        assert_eq!(bulk_discount_rate(10), Decimal::new(10, 2));
        assert_eq!(bulk_discount_rate(24), Decimal::new(10, 2));
        assert_eq!(bulk_discount_rate(25), Decimal::new(15, 2));
        assert_eq!(bulk_discount_rate(49), Decimal::new(15, 2));
        assert_eq!(bulk_discount_rate(50), Decimal::new(20, 2));
        assert_eq!(bulk_discount_rate(400), Decimal::new(20, 2));
    }

    #[test]
    fn no_discount_below_first_tier() {
        assert!(BulkDiscount::for_hardware(3, Decimal::new(1_000, 0)).is_none());

        let discount =
            BulkDiscount::for_hardware(25, Decimal::new(2_000, 0)).expect("discount applies");
        assert_eq!(discount.amount, Decimal::new(300, 0));
        assert_eq!(discount.percent(), Decimal::new(15, 0));
    }
}
