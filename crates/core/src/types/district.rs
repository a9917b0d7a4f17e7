//! District normalization for shipping comparisons.
//!
//! Kathmandu, Lalitpur and Bhaktapur are served by the same delivery fleet,
//! so they collapse into a single logical region before two districts are
//! compared. Valley membership ignores case and surrounding whitespace; every
//! other district name is compared exactly as given.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the logical region formed by the valley districts.
pub const KATHMANDU_VALLEY: &str = "Kathmandu Valley";

/// Districts that share the Kathmandu Valley region (lowercase).
const VALLEY_DISTRICTS: &[&str] = &["kathmandu", "lalitpur", "bhaktapur"];

/// A district name as delivered by the vendor or customer profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct District(String);

impl District {
    /// Create a district from a raw name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The raw district name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is empty once surrounding whitespace is removed.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The logical shipping region of this district.
    ///
    /// Valley districts map to [`KATHMANDU_VALLEY`]; everything else passes
    /// through unchanged.
    #[must_use]
    pub fn region(&self) -> Cow<'_, str> {
        if is_valley_district(self.0.trim()) {
            Cow::Borrowed(KATHMANDU_VALLEY)
        } else {
            Cow::Borrowed(&self.0)
        }
    }

    /// Whether two districts belong to the same shipping region.
    ///
    /// Only valley membership is case-insensitive; other names must match
    /// exactly. A blank district never matches.
    #[must_use]
    pub fn same_region(&self, other: &Self) -> bool {
        if self.is_blank() || other.is_blank() {
            return false;
        }
        self.region() == other.region()
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for District {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for District {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

fn is_valley_district(name: &str) -> bool {
    VALLEY_DISTRICTS
        .iter()
        .any(|valley| name.eq_ignore_ascii_case(valley))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valley_districts_collapse() {
        for name in ["Kathmandu", "LALITPUR", "bhaktapur", "  Lalitpur "] {
            assert_eq!(District::new(name).region(), KATHMANDU_VALLEY);
        }
    }

    #[test]
    fn test_other_districts_pass_through() {
        assert_eq!(District::new("Pokhara").region(), "Pokhara");
        assert_eq!(District::new(" Chitwan ").region(), " Chitwan ");
    }

    #[test]
    fn test_same_region() {
        let kathmandu = District::new("Kathmandu");
        let lalitpur = District::new("lalitpur");
        let pokhara = District::new("Pokhara");

        assert!(kathmandu.same_region(&lalitpur));
        assert!(!kathmandu.same_region(&pokhara));
        assert!(pokhara.same_region(&District::new("Pokhara")));
    }

    #[test]
    fn test_other_districts_are_case_sensitive() {
        let pokhara = District::new("Pokhara");

        assert!(!pokhara.same_region(&District::new("pokhara")));
        assert!(!pokhara.same_region(&District::new("POKHARA")));
        assert!(!pokhara.same_region(&District::new("Pokhara ")));
    }

    #[test]
    fn test_blank_district_never_matches() {
        let blank = District::new("   ");
        assert!(blank.is_blank());
        assert!(!blank.same_region(&District::new("")));
        assert!(!District::new("Pokhara").same_region(&blank));
    }
}
