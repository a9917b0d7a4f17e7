//! Bazaar cart library.
//!
//! Keeps a local cart consistent with the remote cart service and derives
//! checkout totals from it.
//!
//! # Modules
//!
//! - [`client`] - Network boundary to the cart, promo and vendor APIs
//! - [`store`] - Canonical local cart state, mutation guards and the
//!   optimistic quantity overlay
//! - [`checkout`] - Vendor grouping and district-based shipping
//! - [`promo`] - Single active promo code and discounted totals
//!
//! # Consistency
//!
//! Local state is never patched from a mutation response. Every successful
//! mutation is followed by a full fetch of the cart, and the fetched snapshot
//! replaces local state wholesale.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod client;
pub mod config;
pub mod error;
pub mod promo;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use checkout::{OrderSummary, QuantityOverrides, ShippingGroup, VendorDirectory, VendorKey};
pub use client::{AddToCart, CartApi, HttpCartClient};
pub use config::CartConfig;
pub use error::{CartError, ErrorKind};
pub use promo::{PricedOrder, PromoApplier, PromoError};
pub use store::{CartStore, ErrorScope, ItemError, MutationStatus};
