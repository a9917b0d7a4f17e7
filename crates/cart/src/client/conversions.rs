//! Conversions from wire payloads to `bazaar-core` domain types.

use bazaar_core::{
    CartItemId, CartLineItem, District, ProductId, VariantId, Vendor, VendorId, VendorRef,
};
use tracing::debug;

use super::types::{CartItemPayload, VendorLookupPayload, VendorPayload};

/// Convert a fetched cart into domain line items.
///
/// Lines with a non-positive quantity no longer exist as far as the cart is
/// concerned and are dropped.
pub fn convert_cart(items: Vec<CartItemPayload>) -> Vec<CartLineItem> {
    items.into_iter().filter_map(convert_cart_item).collect()
}

fn convert_cart_item(item: CartItemPayload) -> Option<CartLineItem> {
    let Some(quantity) = u32::try_from(item.quantity).ok().filter(|q| *q > 0) else {
        debug!(item_id = %item.id, quantity = item.quantity, "Dropping cart line without quantity");
        return None;
    };

    let line = CartLineItem::new(
        CartItemId::new(item.id),
        ProductId::new(item.product_id),
        item.name,
        item.unit_price,
        quantity,
        convert_vendor_ref(item.vendor),
    )
    .ok()?;

    Some(match item.variant_id.filter(|v| !v.is_empty()) {
        Some(variant) => line.with_variant(VariantId::new(variant)),
        None => line,
    })
}

fn convert_vendor_ref(vendor: VendorPayload) -> VendorRef {
    VendorRef {
        id: VendorId::new(vendor.id),
        business_name: vendor.business_name.filter(|name| !name.trim().is_empty()),
        district: vendor
            .district
            .map(|d| District::new(d.name))
            .filter(|d| !d.is_blank()),
    }
}

/// Convert a vendor lookup response.
pub fn convert_vendor(id: VendorId, vendor: VendorLookupPayload) -> Vendor {
    Vendor {
        id,
        business_name: vendor.business_name,
        district: District::new(vendor.district.name),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::client::types::DistrictPayload;
    use rust_decimal::Decimal;

    fn payload(id: &str, quantity: i64) -> CartItemPayload {
        CartItemPayload {
            id: id.to_string(),
            product_id: format!("product-{id}"),
            variant_id: None,
            name: "Lokta Paper Journal".to_string(),
            unit_price: Decimal::from(300),
            quantity,
            vendor: VendorPayload {
                id: "v1".to_string(),
                business_name: Some(String::new()),
                district: Some(DistrictPayload {
                    name: "Bhaktapur".to_string(),
                }),
            },
        }
    }

    #[test]
    fn test_convert_cart_drops_empty_lines() {
        let items = convert_cart(vec![payload("a", 2), payload("b", 0), payload("c", -1)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, CartItemId::new("a"));
        assert_eq!(items[0].quantity(), 2);
    }

    #[test]
    fn test_convert_vendor_ref_treats_blank_name_as_missing() {
        let items = convert_cart(vec![payload("a", 1)]);
        let vendor = &items[0].vendor;
        assert!(vendor.business_name.is_none());
        assert_eq!(vendor.district, Some(District::new("Bhaktapur")));
    }

    #[test]
    fn test_convert_variant() {
        let mut with_variant = payload("a", 1);
        with_variant.variant_id = Some("size-m".to_string());
        let items = convert_cart(vec![with_variant]);
        assert_eq!(items[0].variant_id, Some(VariantId::new("size-m")));
    }
}
