//! Printable proposal layout.
//!
//! [`QuoteDocument::assemble`] turns a quote, its purchasable lines and the
//! estimated labor into the section tree a renderer walks. Inputs are
//! bounds-checked first; out-of-range amounts are reported as
//! [`DomainError::OutOfRange`] instead of overflowing. Every optional
//! section is `None` when its input is empty; renderers never see an empty
//! block. Image references are carried as [`DocumentImage`] slots that start
//! out `Pending` and are filled in by the renderer after fetching.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::discount::BulkDiscount;
use crate::errors::DomainError;
use crate::domain::labor::{LaborLineItem, MaterialLine};
use crate::domain::quote::{
    BillingPeriod, CustomerInfo, PropertyMetadata, Quote, QuoteLineItem,
};
use crate::money::{serialize_currency, serialize_hours};

pub const OTHER_DOMAIN: &str = "other";
const MONTHS_PER_YEAR: i64 = 12;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImageContent {
    Pending,
    Embedded { data_uri: String },
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentImage {
    pub reference: String,
    pub content: ImageContent,
}

impl DocumentImage {
    fn pending(reference: &str) -> Self {
        Self { reference: reference.to_string(), content: ImageContent::Pending }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.content, ImageContent::Embedded { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub quote_number: String,
    pub created_at: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub billing_period: BillingPeriod,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLine {
    pub product_name: String,
    pub quantity: u32,
    #[serde(serialize_with = "serialize_currency")]
    pub period_price: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub line_total: Decimal,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionBlock {
    pub lines: Vec<SubscriptionLine>,
    pub period_suffix: String,
    #[serde(serialize_with = "serialize_currency")]
    pub period_total: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub first_year_total: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub annual_savings: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    pub product_name: String,
    pub quantity: u32,
    #[serde(serialize_with = "serialize_currency")]
    pub unit_price: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub line_total: Decimal,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDomain {
    pub domain: String,
    pub lines: Vec<ProductLine>,
    #[serde(serialize_with = "serialize_currency")]
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductBlock {
    pub domains: Vec<ProductDomain>,
    pub total_units: u32,
    #[serde(serialize_with = "serialize_currency")]
    pub hardware_subtotal: Decimal,
    pub discount: Option<BulkDiscount>,
    #[serde(serialize_with = "serialize_currency")]
    pub hardware_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborEntry {
    pub task_name: String,
    pub description: String,
    #[serde(serialize_with = "serialize_hours")]
    pub hours: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub hourly_rate: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub labor_cost: Decimal,
    pub materials: Vec<MaterialLine>,
    #[serde(serialize_with = "serialize_currency")]
    pub total_cost: Decimal,
    pub is_optional: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborGroup {
    pub category: String,
    pub entries: Vec<LaborEntry>,
    #[serde(serialize_with = "serialize_currency")]
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationFee {
    pub product_name: String,
    #[serde(serialize_with = "serialize_currency")]
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborBlock {
    pub groups: Vec<LaborGroup>,
    pub installation_fees: Vec<InstallationFee>,
    #[serde(serialize_with = "serialize_hours")]
    pub total_hours: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrandTotals {
    #[serde(serialize_with = "serialize_currency")]
    pub hardware: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub installation: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub first_year_subscription: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub year_one_total: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub year_two_plus_total: Decimal,
    #[serde(serialize_with = "serialize_currency")]
    pub annual_savings: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRow {
    pub room: String,
    pub device: String,
    pub quantity: u32,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorPlanView {
    pub title: String,
    pub image: DocumentImage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanView {
    pub title: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoPairView {
    pub caption: String,
    pub before: DocumentImage,
    pub after: DocumentImage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDocument {
    pub header: DocumentHeader,
    pub customer: CustomerInfo,
    pub property: Option<PropertyMetadata>,
    pub subscriptions: Option<SubscriptionBlock>,
    pub products: Option<ProductBlock>,
    pub labor: Option<LaborBlock>,
    pub totals: GrandTotals,
    pub device_placements: Option<Vec<PlacementRow>>,
    pub floor_plans: Option<Vec<FloorPlanView>>,
    pub scans: Option<Vec<ScanView>>,
    pub photo_pairs: Option<Vec<PhotoPairView>>,
}

impl QuoteDocument {
    pub fn from_quote(quote: &Quote, labor_items: &[LaborLineItem]) -> Result<Self, DomainError> {
        Self::assemble(quote, &quote.line_items, labor_items)
    }

    pub fn assemble(
        quote: &Quote,
        line_items: &[QuoteLineItem],
        labor_items: &[LaborLineItem],
    ) -> Result<Self, DomainError> {
        for (index, item) in line_items.iter().enumerate() {
            item.validate(index)?;
        }
        for (index, item) in labor_items.iter().enumerate() {
            item.validate(index)?;
        }

        let subscriptions = subscription_block(line_items, quote.billing_period);
        let products = product_block(line_items);
        let labor = labor_block(line_items, labor_items);

        let hardware = products.as_ref().map(|block| block.hardware_total).unwrap_or_default();
        let installation = labor.as_ref().map(|block| block.total).unwrap_or_default();
        let first_year_subscription =
            subscriptions.as_ref().map(|block| block.first_year_total).unwrap_or_default();
        let annual_savings =
            subscriptions.as_ref().map(|block| block.annual_savings).unwrap_or_default();

        let totals = GrandTotals {
            hardware,
            installation,
            first_year_subscription,
            year_one_total: hardware + installation + first_year_subscription,
            year_two_plus_total: first_year_subscription,
            annual_savings,
        };

        let document = Self {
            header: DocumentHeader {
                quote_number: quote.quote_number.clone(),
                created_at: quote.created_at,
                valid_until: quote.valid_until,
                billing_period: quote.billing_period,
                notes: quote.notes.clone().filter(|notes| !notes.trim().is_empty()),
            },
            customer: quote.customer.clone(),
            property: quote.property.clone().filter(|property| !property.is_empty()),
            subscriptions,
            products,
            labor,
            totals,
            device_placements: non_empty(
                quote
                    .device_placements
                    .iter()
                    .map(|placement| PlacementRow {
                        room: placement.room.clone(),
                        device: placement.device.clone(),
                        quantity: placement.quantity.unwrap_or(1),
                        notes: placement.notes.clone(),
                    })
                    .collect(),
            ),
            floor_plans: non_empty(
                quote
                    .floor_plans
                    .iter()
                    .map(|plan| FloorPlanView {
                        title: plan.title.clone(),
                        image: DocumentImage::pending(&plan.image_ref),
                    })
                    .collect(),
            ),
            scans: non_empty(
                quote
                    .scans
                    .iter()
                    .map(|scan| ScanView { title: scan.title.clone(), url: scan.url.clone() })
                    .collect(),
            ),
            photo_pairs: non_empty(
                quote
                    .photo_pairs
                    .iter()
                    .map(|pair| PhotoPairView {
                        caption: pair.caption.clone(),
                        before: DocumentImage::pending(&pair.before_ref),
                        after: DocumentImage::pending(&pair.after_ref),
                    })
                    .collect(),
            ),
        };

        debug!(
            event_name = "document.assembled",
            quote_number = %document.header.quote_number,
            image_count = document.image_references().len(),
            year_one_total = %document.totals.year_one_total,
            "quote document layout assembled"
        );
        Ok(document)
    }

    /// Image references in document order.
    pub fn image_references(&self) -> Vec<String> {
        let mut references = Vec::new();
        for plan in self.floor_plans.iter().flatten() {
            references.push(plan.image.reference.clone());
        }
        for pair in self.photo_pairs.iter().flatten() {
            references.push(pair.before.reference.clone());
            references.push(pair.after.reference.clone());
        }
        references
    }

    /// Fills every image slot from `lookup`; references it cannot answer become `Unavailable`.
    pub fn embed_images<F>(&mut self, mut lookup: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut fill = |image: &mut DocumentImage| {
            image.content = match lookup(&image.reference) {
                Some(data_uri) => ImageContent::Embedded { data_uri },
                None => ImageContent::Unavailable,
            };
        };

        for plan in self.floor_plans.iter_mut().flatten() {
            fill(&mut plan.image);
        }
        for pair in self.photo_pairs.iter_mut().flatten() {
            fill(&mut pair.before);
            fill(&mut pair.after);
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn subscription_block(
    line_items: &[QuoteLineItem],
    billing_period: BillingPeriod,
) -> Option<SubscriptionBlock> {
    let mut lines = Vec::new();
    let mut annual_savings = Decimal::ZERO;

    for item in line_items.iter().filter(|item| item.is_subscription()) {
        let period_price = match billing_period {
            BillingPeriod::Annual => item.annual_rate,
            BillingPeriod::Monthly => item.monthly_rate,
        }
        .unwrap_or(item.unit_price);
        let quantity = Decimal::from(item.quantity);

        if billing_period == BillingPeriod::Annual {
            if let (Some(monthly), Some(annual)) = (item.monthly_rate, item.annual_rate) {
                let savings = monthly * Decimal::from(MONTHS_PER_YEAR) - annual;
                if savings > Decimal::ZERO {
                    annual_savings += savings * quantity;
                }
            }
        }

        lines.push(SubscriptionLine {
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            period_price,
            line_total: period_price * quantity,
            description: item.description.clone(),
        });
    }

    if lines.is_empty() {
        return None;
    }

    let period_total: Decimal = lines.iter().map(|line| line.line_total).sum();
    let first_year_total = match billing_period {
        BillingPeriod::Annual => period_total,
        BillingPeriod::Monthly => period_total * Decimal::from(MONTHS_PER_YEAR),
    };

    Some(SubscriptionBlock {
        lines,
        period_suffix: billing_period.suffix().to_string(),
        period_total,
        first_year_total,
        annual_savings,
    })
}

fn product_domain_key(item: &QuoteLineItem) -> String {
    item.domain
        .as_deref()
        .map(|domain| domain.trim().to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
        .unwrap_or_else(|| OTHER_DOMAIN.to_string())
}

fn product_block(line_items: &[QuoteLineItem]) -> Option<ProductBlock> {
    let mut domains: Vec<ProductDomain> = Vec::new();
    let mut total_units: u32 = 0;

    for item in line_items.iter().filter(|item| !item.is_subscription() && !item.is_installation()) {
        let key = product_domain_key(item);
        let line = ProductLine {
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.extended_price(),
            description: item.description.clone(),
        };
        total_units = total_units.saturating_add(item.quantity);

        match domains.iter_mut().find(|domain| domain.domain == key) {
            Some(domain) => {
                domain.subtotal += line.line_total;
                domain.lines.push(line);
            }
            None => domains.push(ProductDomain {
                domain: key,
                subtotal: line.line_total,
                lines: vec![line],
            }),
        }
    }

    if domains.is_empty() {
        return None;
    }

    let hardware_subtotal: Decimal = domains.iter().map(|domain| domain.subtotal).sum();
    let discount = BulkDiscount::for_hardware(total_units, hardware_subtotal);
    let hardware_total =
        hardware_subtotal - discount.as_ref().map(|discount| discount.amount).unwrap_or_default();

    Some(ProductBlock { domains, total_units, hardware_subtotal, discount, hardware_total })
}

fn labor_block(line_items: &[QuoteLineItem], labor_items: &[LaborLineItem]) -> Option<LaborBlock> {
    let mut groups: Vec<LaborGroup> = Vec::new();

    for item in labor_items {
        let label = item.category.label();
        let entry = LaborEntry {
            task_name: item.task_name.clone(),
            description: item.description.clone(),
            hours: item.estimated_hours,
            hourly_rate: item.hourly_rate,
            labor_cost: item.labor_subtotal,
            materials: item.materials_needed.clone(),
            total_cost: item.total_cost,
            is_optional: item.is_optional,
        };

        match groups.iter_mut().find(|group| group.category == label) {
            Some(group) => {
                group.subtotal += entry.total_cost;
                group.entries.push(entry);
            }
            None => groups.push(LaborGroup {
                category: label.to_string(),
                subtotal: entry.total_cost,
                entries: vec![entry],
            }),
        }
    }

    let installation_fees: Vec<InstallationFee> = line_items
        .iter()
        .filter(|item| item.is_installation())
        .map(|item| InstallationFee {
            product_name: item.product_name.clone(),
            amount: item.extended_price(),
        })
        .collect();

    if groups.is_empty() && installation_fees.is_empty() {
        return None;
    }

    let total_hours: Decimal = labor_items.iter().map(|item| item.estimated_hours).sum();
    let total = groups.iter().map(|group| group.subtotal).sum::<Decimal>()
        + installation_fees.iter().map(|fee| fee.amount).sum::<Decimal>();

    Some(LaborBlock { groups, installation_fees, total_hours, total })
}
