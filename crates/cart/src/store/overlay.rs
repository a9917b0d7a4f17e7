//! Optimistic quantity overlay.
//!
//! While a quantity change is in flight, the predicted quantity is kept in a
//! side table so readers can show it before the service answers. Each entry
//! is owned by exactly one pending mutation, through an [`OverlayTicket`].
//! Settling the ticket removes the entry whatever the outcome; readers then
//! see the authoritative quantity again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bazaar_core::CartItemId;

#[derive(Debug, Clone, Copy)]
struct OverlayEntry {
    owner: u64,
    quantity: u32,
}

/// Keyed table of predicted quantities.
#[derive(Debug, Default)]
pub struct OptimisticOverlay {
    entries: Mutex<HashMap<CartItemId, OverlayEntry>>,
    next_owner: AtomicU64,
}

impl OptimisticOverlay {
    /// Create an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CartItemId, OverlayEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a predicted quantity for `item_id`.
    ///
    /// The returned ticket owns the entry; dropping or settling it clears
    /// the entry unless a later prediction has taken ownership.
    #[must_use]
    pub fn predict(&self, item_id: CartItemId, quantity: u32) -> OverlayTicket<'_> {
        let owner = self.next_owner.fetch_add(1, Ordering::Relaxed);
        self.entries()
            .insert(item_id.clone(), OverlayEntry { owner, quantity });
        OverlayTicket {
            overlay: self,
            item_id,
            owner,
        }
    }

    /// The predicted quantity for `item_id`, if a mutation is pending.
    #[must_use]
    pub fn predicted(&self, item_id: &CartItemId) -> Option<u32> {
        self.entries().get(item_id).map(|entry| entry.quantity)
    }

    /// Number of pending predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no prediction is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn settle(&self, item_id: &CartItemId, owner: u64) {
        let mut entries = self.entries();
        if entries.get(item_id).is_some_and(|entry| entry.owner == owner) {
            entries.remove(item_id);
        }
    }
}

/// Ownership of one overlay entry. Clears the entry on drop.
#[derive(Debug)]
pub struct OverlayTicket<'a> {
    overlay: &'a OptimisticOverlay,
    item_id: CartItemId,
    owner: u64,
}

impl OverlayTicket<'_> {
    /// Clear the entry now.
    pub fn settle(self) {
        drop(self);
    }
}

impl Drop for OverlayTicket<'_> {
    fn drop(&mut self) {
        self.overlay.settle(&self.item_id, self.owner);
    }
}
