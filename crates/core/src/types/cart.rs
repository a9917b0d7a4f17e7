//! Cart line items.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use super::district::District;
use super::id::{CartItemId, ProductId, VariantId, VendorId};
use super::vendor::VendorRef;

/// A line item must hold at least one unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Quantity for cart item {0} must be at least 1")]
pub struct QuantityError(pub CartItemId);

/// One product/variant/quantity entry with a server-assigned identity.
///
/// `quantity` is always at least 1. An item that reaches zero is removed by
/// the server, never kept with a zero quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineItem {
    /// Server-assigned line ID, stable across fetches.
    pub id: CartItemId,
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Selected variant, if the product has variants.
    pub variant_id: Option<VariantId>,
    /// Product name.
    pub name: String,
    /// Price of a single unit.
    pub unit_price: Decimal,
    /// Number of units.
    quantity: u32,
    /// Vendor selling this product.
    pub vendor: VendorRef,
}

impl CartLineItem {
    /// Create a line item.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if `quantity` is zero.
    pub fn new(
        id: CartItemId,
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
        vendor: VendorRef,
    ) -> Result<Self, QuantityError> {
        if quantity == 0 {
            return Err(QuantityError(id));
        }
        Ok(Self {
            id,
            product_id,
            variant_id: None,
            name: name.into(),
            unit_price,
            quantity,
            vendor,
        })
    }

    /// Set the variant.
    #[must_use]
    pub fn with_variant(mut self, variant_id: VariantId) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    /// Number of units on this line (always at least 1).
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// The vendor ID.
    #[must_use]
    pub const fn vendor_id(&self) -> &VendorId {
        &self.vendor.id
    }

    /// The vendor's shipping district, if known.
    #[must_use]
    pub const fn vendor_district(&self) -> Option<&District> {
        self.vendor.district.as_ref()
    }

    /// `unit_price × quantity` for an arbitrary quantity.
    #[must_use]
    pub fn price_for(&self, quantity: u32) -> Decimal {
        self.unit_price * Decimal::from(quantity)
    }

    /// `unit_price × quantity` for the stored quantity.
    #[must_use]
    pub fn line_price(&self) -> Decimal {
        self.price_for(self.quantity)
    }
}
