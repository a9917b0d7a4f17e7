//! Vendor grouping and order totals.
//!
//! Everything here is a pure function of a cart snapshot, a destination
//! district and optional quantity overrides. Nothing is cached; callers
//! recompute a summary whenever the cart or the destination changes.

use std::collections::HashMap;
use std::fmt;

use bazaar_core::{CartItemId, CartLineItem, District, QuantityError};
use rust_decimal::Decimal;
use serde::Serialize;

use super::shipping::shipping_cost;

/// Composite key a vendor group is formed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VendorKey {
    /// Vendor business name, or the vendor ID while the name is unresolved.
    pub business_name: String,
    /// Vendor district; empty while unresolved.
    pub district: District,
}

impl VendorKey {
    /// The key `item` groups under.
    #[must_use]
    pub fn for_item(item: &CartLineItem) -> Self {
        let business_name = item
            .vendor
            .business_name
            .clone()
            .unwrap_or_else(|| item.vendor.id.to_string());
        let district = item
            .vendor
            .district
            .clone()
            .unwrap_or_else(|| District::new(""));
        Self {
            business_name,
            district,
        }
    }
}

impl fmt::Display for VendorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.district.is_blank() {
            f.write_str(&self.business_name)
        } else {
            write!(f, "{} ({})", self.business_name, self.district.as_str().trim())
        }
    }
}

/// Checkout-time quantities that differ from the cart's stored quantities.
///
/// Overrides never write back to the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantityOverrides {
    quantities: HashMap<CartItemId, u32>,
}

impl QuantityOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the quantity of one item.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if `quantity` is zero.
    pub fn set(&mut self, item_id: CartItemId, quantity: u32) -> Result<(), QuantityError> {
        if quantity == 0 {
            return Err(QuantityError(item_id));
        }
        self.quantities.insert(item_id, quantity);
        Ok(())
    }

    /// The quantity to price `item` at.
    #[must_use]
    pub fn quantity_for(&self, item: &CartLineItem) -> u32 {
        self.quantities
            .get(&item.id)
            .copied()
            .unwrap_or_else(|| item.quantity())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

/// Partition items by [`VendorKey`].
///
/// Groups appear in the order their first item appears; items keep their
/// relative order within a group. Every item lands in exactly one group.
#[must_use]
pub fn group_by_vendor(items: &[CartLineItem]) -> Vec<(VendorKey, Vec<CartLineItem>)> {
    let mut groups: Vec<(VendorKey, Vec<CartLineItem>)> = Vec::new();
    let mut positions: HashMap<VendorKey, usize> = HashMap::new();

    for item in items {
        let key = VendorKey::for_item(item);
        if let Some(group) = positions.get(&key).and_then(|&pos| groups.get_mut(pos)) {
            group.1.push(item.clone());
        } else {
            positions.insert(key.clone(), groups.len());
            groups.push((key, vec![item.clone()]));
        }
    }

    groups
}

/// One line within a shipping group, priced at its effective quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupLine {
    pub item: CartLineItem,
    /// Cart quantity, or the override when one was given.
    pub quantity: u32,
}

impl GroupLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_price(&self) -> Decimal {
        self.item.price_for(self.quantity)
    }
}

/// The items one vendor ships, with their subtotal and shipping cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingGroup {
    pub key: VendorKey,
    pub lines: Vec<GroupLine>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    /// `subtotal + shipping_cost`.
    pub line_total: Decimal,
}

impl ShippingGroup {
    fn build(
        key: VendorKey,
        items: Vec<CartLineItem>,
        destination: Option<&District>,
        overrides: &QuantityOverrides,
    ) -> Self {
        let lines: Vec<GroupLine> = items
            .into_iter()
            .map(|item| {
                let quantity = overrides.quantity_for(&item);
                GroupLine { item, quantity }
            })
            .collect();
        let subtotal = lines.iter().map(GroupLine::line_price).sum();
        let vendor_district = Some(&key.district).filter(|d| !d.is_blank());
        let shipping_cost = shipping_cost(destination, vendor_district);

        Self {
            key,
            lines,
            subtotal,
            shipping_cost,
            line_total: subtotal + shipping_cost,
        }
    }

    #[must_use]
    pub const fn vendor_key(&self) -> &VendorKey {
        &self.key
    }

    /// The cart items in this group.
    pub fn items(&self) -> impl Iterator<Item = &CartLineItem> {
        self.lines.iter().map(|line| &line.item)
    }
}

/// Vendor groups and aggregate totals for a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub groups: Vec<ShippingGroup>,
    /// Sum of group subtotals.
    pub subtotal: Decimal,
    /// Sum of group shipping costs.
    pub total_shipping: Decimal,
    /// `subtotal + total_shipping`.
    pub grand_total: Decimal,
}

impl OrderSummary {
    /// Summarize `items` shipped to `destination`.
    #[must_use]
    pub fn compute(
        items: &[CartLineItem],
        destination: Option<&District>,
        overrides: &QuantityOverrides,
    ) -> Self {
        let groups: Vec<ShippingGroup> = group_by_vendor(items)
            .into_iter()
            .map(|(key, items)| ShippingGroup::build(key, items, destination, overrides))
            .collect();

        let subtotal: Decimal = groups.iter().map(|g| g.subtotal).sum();
        let total_shipping: Decimal = groups.iter().map(|g| g.shipping_cost).sum();

        Self {
            groups,
            subtotal,
            total_shipping,
            grand_total: subtotal + total_shipping,
        }
    }

    /// Summarize a single-item "buy now" checkout at `quantity`.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if `quantity` is zero.
    pub fn buy_now(
        item: &CartLineItem,
        quantity: u32,
        destination: Option<&District>,
    ) -> Result<Self, QuantityError> {
        let mut overrides = QuantityOverrides::new();
        overrides.set(item.id.clone(), quantity)?;
        Ok(Self::compute(
            std::slice::from_ref(item),
            destination,
            &overrides,
        ))
    }

    /// Total units across all groups at their effective quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.groups
            .iter()
            .flat_map(|g| g.lines.iter())
            .map(|line| line.quantity)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{line, vendor};
    use bazaar_core::{VendorId, VendorRef};

    fn kathmandu_pokhara_cart() -> Vec<CartLineItem> {
        vec![
            line("a1", 500, 2, vendor("va", "Himalayan Weaves", "Kathmandu")),
            line("b1", 300, 1, vendor("vb", "Lakeside Crafts", "Pokhara")),
            line("a2", 150, 1, vendor("va", "Himalayan Weaves", "Kathmandu")),
        ]
    }

    #[test]
    fn test_group_by_vendor_is_stable_partition() {
        let items = kathmandu_pokhara_cart();
        let groups = group_by_vendor(&items);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.business_name, "Himalayan Weaves");
        assert_eq!(groups[1].0.business_name, "Lakeside Crafts");

        let ids: Vec<&str> = groups
            .iter()
            .flat_map(|(_, items)| items.iter().map(|i| i.id.as_str()))
            .collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
        assert_eq!(ids.len(), items.len());
    }

    #[test]
    fn test_same_name_different_district_splits() {
        let items = vec![
            line("x", 100, 1, vendor("v1", "Everest Tea", "Ilam")),
            line("y", 100, 1, vendor("v1", "Everest Tea", "Jhapa")),
        ];
        assert_eq!(group_by_vendor(&items).len(), 2);
    }

    #[test]
    fn test_unresolved_vendor_groups_by_id() {
        let items = vec![line(
            "u",
            100,
            1,
            VendorRef::unresolved(VendorId::new("vendor-9")),
        )];
        let groups = group_by_vendor(&items);
        assert_eq!(groups[0].0.business_name, "vendor-9");
        assert!(groups[0].0.district.is_blank());
    }

    #[test]
    fn test_lalitpur_customer_shipping_scenario() {
        let items = kathmandu_pokhara_cart();
        let summary = OrderSummary::compute(
            &items,
            Some(&District::new("Lalitpur")),
            &QuantityOverrides::new(),
        );

        assert_eq!(summary.groups[0].shipping_cost, Decimal::from(100));
        assert_eq!(summary.groups[1].shipping_cost, Decimal::from(200));
        assert_eq!(summary.total_shipping, Decimal::from(300));
        assert_eq!(summary.groups[0].subtotal, Decimal::from(1150));
        assert_eq!(summary.groups[0].line_total, Decimal::from(1250));
        assert_eq!(summary.subtotal, Decimal::from(1450));
        assert_eq!(summary.grand_total, Decimal::from(1750));
        assert_eq!(summary.item_count(), 4);
    }

    #[test]
    fn test_unknown_destination_ships_free() {
        let summary =
            OrderSummary::compute(&kathmandu_pokhara_cart(), None, &QuantityOverrides::new());
        assert_eq!(summary.total_shipping, Decimal::ZERO);
        assert_eq!(summary.grand_total, summary.subtotal);
    }

    #[test]
    fn test_overrides_change_pricing_only() {
        let items = kathmandu_pokhara_cart();
        let mut overrides = QuantityOverrides::new();
        overrides.set(CartItemId::new("b1"), 3).unwrap();

        let summary = OrderSummary::compute(&items, None, &overrides);

        assert_eq!(summary.groups[1].subtotal, Decimal::from(900));
        assert_eq!(items[1].quantity(), 1);
        assert!(overrides.set(CartItemId::new("b1"), 0).is_err());
    }

    #[test]
    fn test_buy_now_single_group() {
        let item = line("b1", 300, 1, vendor("vb", "Lakeside Crafts", "Pokhara"));
        let summary = OrderSummary::buy_now(&item, 4, Some(&District::new("Pokhara"))).unwrap();

        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.subtotal, Decimal::from(1200));
        assert_eq!(summary.total_shipping, Decimal::from(100));
        assert_eq!(summary.grand_total, Decimal::from(1300));
        assert_eq!(summary.item_count(), 4);
    }

    #[test]
    fn test_empty_cart() {
        let summary = OrderSummary::compute(
            &[],
            Some(&District::new("Kathmandu")),
            &QuantityOverrides::new(),
        );
        assert!(summary.is_empty());
        assert_eq!(summary.grand_total, Decimal::ZERO);
    }
}
