//! Wire types for the cart, promo and vendor APIs.
//!
//! These mirror the JSON the cart service speaks (camelCase) and are kept
//! separate from the domain types in `bazaar-core`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Cart
// =============================================================================

/// One line item as returned by `GET /cart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub vendor: VendorPayload,
}

/// Vendor block embedded in a cart item. Only the ID is guaranteed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPayload {
    pub id: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub district: Option<DistrictPayload>,
}

/// `{ "name": "Kathmandu" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictPayload {
    pub name: String,
}

/// Body of `POST /cart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody<'a> {
    pub product_id: &'a str,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<&'a str>,
}

/// Body of `DELETE /cart`.
///
/// Without `decrease_only` the whole line is removed. With it, the line
/// loses one unit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemBody<'a> {
    pub cart_item_id: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub decrease_only: bool,
}

// =============================================================================
// Vendors
// =============================================================================

/// Body of `GET /vendors/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorLookupPayload {
    pub business_name: String,
    pub district: DistrictPayload,
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned by the cart service on non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

impl ErrorBody {
    /// Parse an error body, falling back to the raw text as the message.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        serde_json::from_str::<Self>(text)
            .ok()
            .filter(|body| body.message.is_some() || body.error.is_some())
            .unwrap_or_else(|| Self {
                message: Some(text.trim().to_string()),
                ..Self::default()
            })
    }

    /// The most specific message available.
    #[must_use]
    pub fn into_message(self) -> String {
        self.message.or(self.error).unwrap_or_default()
    }
}
