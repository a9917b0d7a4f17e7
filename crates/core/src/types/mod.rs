//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod district;
pub mod id;
pub mod promo;
pub mod vendor;

pub use cart::{CartLineItem, QuantityError};
pub use district::{District, KATHMANDU_VALLEY};
pub use id::*;
pub use promo::PromoCode;
pub use vendor::{Vendor, VendorRef};
