//! Checkout aggregation.
//!
//! # Architecture
//!
//! - [`group_by_vendor`] partitions a cart snapshot by vendor business name
//!   and district
//! - [`shipping_cost`] prices each group from the customer's district
//! - [`OrderSummary`] rolls groups up into subtotal, shipping and grand total
//! - [`VendorDirectory`] fills in vendor names and districts the cart
//!   response left out

mod grouping;
mod shipping;
mod vendors;

pub use grouping::{
    GroupLine, OrderSummary, QuantityOverrides, ShippingGroup, VendorKey, group_by_vendor,
};
pub use shipping::{OTHER_REGION_RATE, SAME_REGION_RATE, shipping_cost};
pub use vendors::VendorDirectory;
