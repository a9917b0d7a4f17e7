//! District-based shipping rates.

use bazaar_core::District;
use rust_decimal::Decimal;

/// Rate when the vendor ships within the customer's region.
pub const SAME_REGION_RATE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Rate when the vendor ships from another region.
pub const OTHER_REGION_RATE: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Shipping cost for one vendor group.
///
/// Returns zero while the customer's district is unknown (absent or blank).
/// A vendor without a known district never matches, so it ships at the
/// other-region rate.
#[must_use]
pub fn shipping_cost(destination: Option<&District>, vendor: Option<&District>) -> Decimal {
    let Some(destination) = destination.filter(|d| !d.is_blank()) else {
        return Decimal::ZERO;
    };
    match vendor {
        Some(vendor) if destination.same_region(vendor) => SAME_REGION_RATE,
        _ => OTHER_REGION_RATE,
    }
}
