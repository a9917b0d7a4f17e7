//! Promo code application.
//!
//! At most one promo is active. Its percentage is applied to the order's
//! grand total and the discount is rounded to whole currency units, half
//! away from zero.

use bazaar_core::PromoCode;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::client::CartApi;
use crate::error::CartError;

#[derive(Debug, Error)]
pub enum PromoError {
    #[error("Promo code not found: {0}")]
    NotFound(String),

    #[error("Failed to load promo codes: {0}")]
    Catalog(#[from] CartError),
}

/// Totals after the active promo, if any, is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricedOrder {
    pub grand_total: Decimal,
    /// Percentage of the active promo; `None` without one.
    pub discount_percentage: Option<Decimal>,
    pub discount_amount: Decimal,
    /// `grand_total - discount_amount`.
    pub final_total: Decimal,
}

/// Holds the promo catalog and the single active promo.
#[derive(Debug, Clone, Default)]
pub struct PromoApplier {
    catalog: Vec<PromoCode>,
    applied: Option<PromoCode>,
}

impl PromoApplier {
    /// Create an applier over an already fetched catalog.
    #[must_use]
    pub const fn new(catalog: Vec<PromoCode>) -> Self {
        Self {
            catalog,
            applied: None,
        }
    }

    /// Fetch the catalog from the cart service.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::Catalog` if the fetch fails.
    #[instrument(skip(api))]
    pub async fn load<A: CartApi + ?Sized>(api: &A) -> Result<Self, PromoError> {
        let catalog = api.fetch_promo_codes().await?;
        debug!(codes = catalog.len(), "Loaded promo catalog");
        Ok(Self::new(catalog))
    }

    /// Activate `code`, replacing any active promo.
    ///
    /// Returns the discount percentage. Applying the code that is already
    /// active changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `PromoError::NotFound` if no catalog entry matches; the active
    /// promo is left as it was.
    pub fn apply(&mut self, code: &str) -> Result<Decimal, PromoError> {
        let code = code.trim();

        if let Some(active) = self.applied.as_ref().filter(|p| p.matches(code)) {
            return Ok(active.discount_percentage);
        }

        let promo = self
            .catalog
            .iter()
            .find(|p| p.matches(code))
            .cloned()
            .ok_or_else(|| PromoError::NotFound(code.to_string()))?;

        info!(code = %promo.code, percentage = %promo.discount_percentage, "Applied promo code");
        let percentage = promo.discount_percentage;
        self.applied = Some(promo);
        Ok(percentage)
    }

    /// Clear the active promo, returning it.
    pub fn remove(&mut self) -> Option<PromoCode> {
        self.applied.take()
    }

    /// The active promo.
    #[must_use]
    pub const fn applied(&self) -> Option<&PromoCode> {
        self.applied.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &[PromoCode] {
        &self.catalog
    }

    /// Discount the active promo grants on `grand_total`.
    #[must_use]
    pub fn discount_amount(&self, grand_total: Decimal) -> Decimal {
        self.applied.as_ref().map_or(Decimal::ZERO, |promo| {
            (grand_total * promo.discount_percentage / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        })
    }

    /// Price an order with the active promo.
    #[must_use]
    pub fn totals(&self, grand_total: Decimal) -> PricedOrder {
        let discount_amount = self.discount_amount(grand_total);
        PricedOrder {
            grand_total,
            discount_percentage: self.applied.as_ref().map(|p| p.discount_percentage),
            discount_amount,
            final_total: grand_total - discount_amount,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::FakeCartApi;
    use bazaar_core::PromoId;

    fn promo(code: &str, percentage: i64) -> PromoCode {
        PromoCode {
            id: PromoId::new(format!("promo-{code}")),
            code: code.to_string(),
            discount_percentage: Decimal::from(percentage),
        }
    }

    fn applier() -> PromoApplier {
        PromoApplier::new(vec![promo("SAVE10", 10), promo("DASHAIN15", 15)])
    }

    #[test]
    fn test_save10_on_1000() {
        let mut promos = applier();
        assert_eq!(promos.apply("SAVE10").unwrap(), Decimal::from(10));

        let priced = promos.totals(Decimal::from(1000));
        assert_eq!(priced.discount_amount, Decimal::from(100));
        assert_eq!(priced.final_total, Decimal::from(900));
        assert_eq!(priced.discount_percentage, Some(Decimal::from(10)));
    }

    #[test]
    fn test_code_lookup_is_case_insensitive_and_trimmed() {
        let mut promos = applier();
        assert!(promos.apply("  save10 ").is_ok());
        assert_eq!(promos.applied().unwrap().code, "SAVE10");
    }

    #[test]
    fn test_remove_restores_grand_total() {
        let mut promos = applier();
        promos.apply("DASHAIN15").unwrap();
        assert!(promos.remove().is_some());

        let priced = promos.totals(Decimal::from(1750));
        assert_eq!(priced.final_total, Decimal::from(1750));
        assert_eq!(priced.discount_amount, Decimal::ZERO);
        assert!(priced.discount_percentage.is_none());
    }

    #[test]
    fn test_reapply_is_noop_and_other_code_replaces() {
        let mut promos = applier();
        promos.apply("SAVE10").unwrap();
        promos.apply("SAVE10").unwrap();
        assert_eq!(promos.applied().unwrap().code, "SAVE10");

        promos.apply("DASHAIN15").unwrap();
        assert_eq!(promos.applied().unwrap().code, "DASHAIN15");
        assert_eq!(promos.totals(Decimal::from(1000)).final_total, Decimal::from(850));
    }

    #[test]
    fn test_unknown_code_keeps_active_promo() {
        let mut promos = applier();
        promos.apply("SAVE10").unwrap();

        let err = promos.apply("FREESHIP").unwrap_err();

        assert!(matches!(err, PromoError::NotFound(ref code) if code == "FREESHIP"));
        assert_eq!(promos.applied().unwrap().code, "SAVE10");
    }

    #[test]
    fn test_discount_rounds_half_away_from_zero() {
        let mut promos = PromoApplier::new(vec![promo("HALF", 5)]);
        promos.apply("HALF").unwrap();

        // 5% of 1010 is 50.5
        assert_eq!(promos.discount_amount(Decimal::from(1010)), Decimal::from(51));
        // 5% of 1009 is 50.45
        assert_eq!(promos.discount_amount(Decimal::from(1009)), Decimal::from(50));
    }

    #[tokio::test]
    async fn test_load_from_api() {
        let api = FakeCartApi::new().with_promo("SAVE10", 10);

        let mut promos = PromoApplier::load(&api).await.unwrap();

        assert_eq!(promos.catalog().len(), 1);
        assert_eq!(promos.apply("save10").unwrap(), Decimal::from(10));
    }
}
