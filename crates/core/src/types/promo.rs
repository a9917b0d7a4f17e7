//! Promo code catalog entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::PromoId;

/// A percentage discount from the promo catalog.
///
/// Promo codes are immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    /// Catalog ID.
    pub id: PromoId,
    /// The code customers type (e.g., "SAVE10").
    pub code: String,
    /// Discount as a percentage of the order total (e.g., 10 for 10% off).
    pub discount_percentage: Decimal,
}

impl PromoCode {
    /// Whether this promo answers to `code`, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        self.code.trim().to_lowercase() == code.trim().to_lowercase()
    }
}
