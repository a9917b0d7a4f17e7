//! Vendor identity and location.

use serde::{Deserialize, Serialize};

use super::district::District;
use super::id::VendorId;

/// A fully resolved vendor, as returned by the vendor lookup API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Vendor ID.
    pub id: VendorId,
    /// Trading name shown to customers.
    pub business_name: String,
    /// District the vendor ships from.
    pub district: District,
}

/// Vendor information embedded in a cart line item.
///
/// The cart response may or may not carry the business name and district.
/// Missing fields are filled in from the vendor lookup API before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRef {
    /// Vendor ID.
    pub id: VendorId,
    /// Trading name, if known.
    pub business_name: Option<String>,
    /// Shipping district, if known.
    pub district: Option<District>,
}

impl VendorRef {
    /// A reference carrying only the vendor ID.
    #[must_use]
    pub const fn unresolved(id: VendorId) -> Self {
        Self {
            id,
            business_name: None,
            district: None,
        }
    }

    /// Whether both the business name and the district are known.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.business_name.is_some() && self.district.is_some()
    }

    /// Fill in missing fields from a looked-up vendor.
    ///
    /// Fields already present on the reference are kept.
    pub fn fill_from(&mut self, vendor: &Vendor) {
        if self.business_name.is_none() {
            self.business_name = Some(vendor.business_name.clone());
        }
        if self.district.is_none() {
            self.district = Some(vendor.district.clone());
        }
    }
}

impl From<Vendor> for VendorRef {
    fn from(vendor: Vendor) -> Self {
        Self {
            id: vendor.id,
            business_name: Some(vendor.business_name),
            district: Some(vendor.district),
        }
    }
}
