pub mod discount;
pub mod layout;

pub use discount::{bulk_discount_rate, BulkDiscount};
pub use layout::{DocumentImage, GrandTotals, ImageContent, QuoteDocument};
