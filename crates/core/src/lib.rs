//! Bazaar Core - Shared types library.
//!
//! This crate provides the domain types used across all Bazaar components:
//! - `cart` - Cart synchronization, checkout aggregation and promo handling
//! - `cli` - Command-line tools driving a remote cart service
//!
//! # Architecture
//!
//! The core crate contains only types and pure policies - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, cart line items, vendors, promo codes and
//!   the district shipping policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
