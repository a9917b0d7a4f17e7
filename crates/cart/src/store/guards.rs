//! Per-identity mutation guards.
//!
//! Three guard sets track which identities have a mutation in flight:
//! `adding` by product, `deleting` and `updating` by cart item. An identity
//! belongs to at most one set at a time, so a delete and a quantity update
//! can never race on the same line.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bazaar_core::{CartItemId, ProductId};

/// A guard-set membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Guard {
    /// An add is in flight for this product.
    Adding(ProductId),
    /// A delete is in flight for this cart item.
    Deleting(CartItemId),
    /// A quantity change is in flight for this cart item.
    Updating(CartItemId),
}

#[derive(Debug, Default)]
struct GuardSets {
    adding: HashSet<ProductId>,
    deleting: HashSet<CartItemId>,
    updating: HashSet<CartItemId>,
}

impl GuardSets {
    fn holds(&self, guard: &Guard) -> bool {
        match guard {
            Guard::Adding(product_id) => self.adding.contains(product_id),
            Guard::Deleting(item_id) => self.deleting.contains(item_id),
            Guard::Updating(item_id) => self.updating.contains(item_id),
        }
    }

    fn item_busy(&self, item_id: &CartItemId) -> bool {
        self.deleting.contains(item_id) || self.updating.contains(item_id)
    }
}

/// The three guard sets, shared by every mutation of one cart.
#[derive(Debug, Default)]
pub struct MutationGuards {
    sets: Mutex<GuardSets>,
}

impl MutationGuards {
    /// Create empty guard sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> MutexGuard<'_, GuardSets> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `guard` if its identity is free.
    ///
    /// Returns `false` when the identity already has a mutation in flight;
    /// the caller must then treat its call as a no-op.
    pub fn try_acquire(&self, guard: &Guard) -> bool {
        let mut sets = self.sets();
        match guard {
            Guard::Adding(product_id) => sets.adding.insert(product_id.clone()),
            Guard::Deleting(item_id) => {
                !sets.item_busy(item_id) && sets.deleting.insert(item_id.clone())
            }
            Guard::Updating(item_id) => {
                !sets.item_busy(item_id) && sets.updating.insert(item_id.clone())
            }
        }
    }

    /// Remove `guard`. Releasing a guard that is not held does nothing.
    pub fn release(&self, guard: &Guard) {
        let mut sets = self.sets();
        match guard {
            Guard::Adding(product_id) => sets.adding.remove(product_id),
            Guard::Deleting(item_id) => sets.deleting.remove(item_id),
            Guard::Updating(item_id) => sets.updating.remove(item_id),
        };
    }

    /// Acquire `guard` for the lifetime of the returned permit.
    ///
    /// The guard is released when the permit drops, including when the
    /// owning future is dropped mid-flight.
    #[must_use]
    pub fn acquire(&self, guard: Guard) -> Option<GuardPermit<'_>> {
        self.try_acquire(&guard).then(|| GuardPermit {
            guards: self,
            guard,
        })
    }

    /// Whether `guard` is currently held.
    #[must_use]
    pub fn holds(&self, guard: &Guard) -> bool {
        self.sets().holds(guard)
    }

    /// Number of identities with a mutation in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        let sets = self.sets();
        sets.adding.len() + sets.deleting.len() + sets.updating.len()
    }
}

/// Membership in a guard set, released on drop.
#[derive(Debug)]
pub struct GuardPermit<'a> {
    guards: &'a MutationGuards,
    guard: Guard,
}

impl GuardPermit<'_> {
    /// The guard this permit holds.
    #[must_use]
    pub const fn guard(&self) -> &Guard {
        &self.guard
    }
}

impl Drop for GuardPermit<'_> {
    fn drop(&mut self) {
        self.guards.release(&self.guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> CartItemId {
        CartItemId::new(id)
    }

    #[test]
    fn test_second_acquire_rejected() {
        let guards = MutationGuards::new();
        let guard = Guard::Adding(ProductId::new("p1"));

        assert!(guards.try_acquire(&guard));
        assert!(!guards.try_acquire(&guard));

        guards.release(&guard);
        assert!(guards.try_acquire(&guard));
    }

    #[test]
    fn test_item_in_one_set_only() {
        let guards = MutationGuards::new();

        assert!(guards.try_acquire(&Guard::Updating(item("c1"))));
        assert!(!guards.try_acquire(&Guard::Deleting(item("c1"))));
        assert!(!guards.try_acquire(&Guard::Updating(item("c1"))));

        // Other items are unaffected
        assert!(guards.try_acquire(&Guard::Deleting(item("c2"))));
        assert!(!guards.try_acquire(&Guard::Updating(item("c2"))));
        assert_eq!(guards.in_flight(), 2);
    }

    #[test]
    fn test_product_and_item_namespaces_are_separate() {
        let guards = MutationGuards::new();
        assert!(guards.try_acquire(&Guard::Adding(ProductId::new("x"))));
        assert!(guards.try_acquire(&Guard::Updating(item("x"))));
    }

    #[test]
    fn test_permit_releases_on_drop() {
        let guards = MutationGuards::new();
        {
            let permit = guards.acquire(Guard::Deleting(item("c1")));
            assert!(permit.is_some());
            assert!(guards.holds(&Guard::Deleting(item("c1"))));
            assert!(guards.acquire(Guard::Deleting(item("c1"))).is_none());
        }
        assert!(!guards.holds(&Guard::Deleting(item("c1"))));
        assert_eq!(guards.in_flight(), 0);
    }

    #[test]
    fn test_release_unheld_is_noop() {
        let guards = MutationGuards::new();
        guards.release(&Guard::Updating(item("missing")));
        assert_eq!(guards.in_flight(), 0);
    }
}
