//! Canonical local cart state.
//!
//! # Architecture
//!
//! - The store is the only writer of cart state, and [`CartStore::set_items`]
//!   is the only way that state changes. Mutation responses are never
//!   patched in; every attempted mutation triggers a full fetch, whether or
//!   not it succeeded
//! - Per-identity [`MutationGuards`] allow at most one in-flight mutation per
//!   product (adds) or cart item (deletes and quantity changes). A duplicate
//!   call is a no-op returning [`MutationStatus::Skipped`]
//! - Quantity changes publish a prediction in the [`OptimisticOverlay`]
//!   until they settle
//! - Failures land on the [`ErrorBoard`] for their identity and expire after
//!   the configured window. A 401 clears the cart instead
//!
//! # Stale snapshots
//!
//! Every fetch is stamped with a monotonically increasing sequence number
//! when it is issued. A snapshot whose number is lower than the last applied
//! one is discarded, so an overlapping fetch that resolves late cannot roll
//! the cart back.

mod errors;
mod guards;
mod overlay;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bazaar_core::{CartItemId, CartLineItem, ProductId, VariantId};
use tracing::{debug, info, instrument, warn};

use crate::client::{AddToCart, CartApi};
use crate::config::CartConfig;
use crate::error::CartError;

pub use errors::{ErrorBoard, ErrorScope, ItemError};
pub use guards::{Guard, GuardPermit, MutationGuards};
pub use overlay::{OptimisticOverlay, OverlayTicket};

/// Result of a guarded mutation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum MutationStatus {
    /// The mutation and its resync both completed.
    Applied,
    /// A mutation for the same identity was already in flight; nothing was sent.
    Skipped,
}

#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartLineItem>,
    applied_seq: u64,
}

/// Local cart backed by a remote cart service.
///
/// Cheaply cloneable; clones share state, guards and overlay.
pub struct CartStore<A> {
    inner: Arc<CartStoreInner<A>>,
}

impl<A> Clone for CartStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CartStoreInner<A> {
    api: A,
    state: Mutex<CartState>,
    fetch_seq: AtomicU64,
    guards: MutationGuards,
    overlay: OptimisticOverlay,
    errors: ErrorBoard,
}

impl<A: CartApi> CartStore<A> {
    /// Create an empty store with the default error window.
    pub fn new(api: A) -> Self {
        Self::with_error_window(api, CartConfig::DEFAULT_ERROR_WINDOW)
    }

    /// Create an empty store using the error window from `config`.
    pub fn from_config(api: A, config: &CartConfig) -> Self {
        Self::with_error_window(api, config.error_window)
    }

    /// Create an empty store whose item errors stay visible for `window`.
    pub fn with_error_window(api: A, window: Duration) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                state: Mutex::new(CartState::default()),
                fetch_seq: AtomicU64::new(0),
                guards: MutationGuards::new(),
                overlay: OptimisticOverlay::new(),
                errors: ErrorBoard::new(window),
            }),
        }
    }

    /// The underlying cart service client.
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the current line items, in server order.
    pub fn items(&self) -> Vec<CartLineItem> {
        self.state().items.clone()
    }

    /// The line item with `item_id`, if present.
    pub fn item(&self, item_id: &CartItemId) -> Option<CartLineItem> {
        self.state()
            .items
            .iter()
            .find(|item| &item.id == item_id)
            .cloned()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    /// Quantity to display for `item_id`.
    ///
    /// While a quantity change is pending this is the predicted value;
    /// otherwise it is the last known server quantity.
    pub fn quantity(&self, item_id: &CartItemId) -> Option<u32> {
        let server = self.item(item_id).map(|item| item.quantity());
        self.inner.overlay.predicted(item_id).or(server)
    }

    /// Total units across all lines, including pending predictions.
    pub fn total_quantity(&self) -> u32 {
        let items = self.items();
        items
            .iter()
            .map(|item| {
                self.inner
                    .overlay
                    .predicted(&item.id)
                    .unwrap_or_else(|| item.quantity())
            })
            .sum()
    }

    /// Whether an add is in flight for `product_id`.
    pub fn is_adding(&self, product_id: &ProductId) -> bool {
        self.inner
            .guards
            .holds(&Guard::Adding(product_id.clone()))
    }

    /// Whether a delete is in flight for `item_id`.
    pub fn is_deleting(&self, item_id: &CartItemId) -> bool {
        self.inner
            .guards
            .holds(&Guard::Deleting(item_id.clone()))
    }

    /// Whether a quantity change is in flight for `item_id`.
    pub fn is_updating(&self, item_id: &CartItemId) -> bool {
        self.inner
            .guards
            .holds(&Guard::Updating(item_id.clone()))
    }

    /// Item errors that have not yet expired.
    pub fn errors(&self) -> Vec<ItemError> {
        self.inner.errors.active()
    }

    /// The error board backing [`CartStore::errors`].
    pub fn error_board(&self) -> &ErrorBoard {
        &self.inner.errors
    }

    // =========================================================================
    // State replacement
    // =========================================================================

    /// Replace local state with a server snapshot.
    ///
    /// The snapshot counts as the newest truth: fetches issued before this
    /// call will be discarded if they resolve afterwards.
    pub fn set_items(&self, items: Vec<CartLineItem>) {
        let seq = self.next_fetch_seq();
        self.apply_snapshot(seq, items);
    }

    fn next_fetch_seq(&self) -> u64 {
        self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply_snapshot(&self, seq: u64, items: Vec<CartLineItem>) -> bool {
        let mut state = self.state();
        if seq < state.applied_seq {
            debug!(
                seq,
                applied = state.applied_seq,
                "Discarding stale cart snapshot"
            );
            return false;
        }
        state.items = items;
        state.applied_seq = seq;
        true
    }

    /// Empty the cart after the session expired.
    fn collapse_to_guest(&self) {
        info!("Cart service rejected the session, clearing local cart");
        self.set_items(Vec::new());
    }

    /// Fetch the cart and replace local state with it.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. On `Unauthorized` the local cart is cleared
    /// first.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), CartError> {
        let seq = self.next_fetch_seq();
        match self.inner.api.fetch_cart().await {
            Ok(items) => {
                self.apply_snapshot(seq, items);
                Ok(())
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.collapse_to_guest();
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero quantity, or the classified
    /// service error. Service errors other than `Unauthorized` are also
    /// surfaced on the error board for the product.
    #[instrument(skip(self, variant_id), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
        variant_id: Option<&VariantId>,
    ) -> Result<MutationStatus, CartError> {
        if quantity == 0 {
            return Err(CartError::invalid_quantity("quantity must be at least 1"));
        }

        let Some(_permit) = self.inner.guards.acquire(Guard::Adding(product_id.clone())) else {
            debug!("Add already in flight for product, skipping");
            return Ok(MutationStatus::Skipped);
        };

        let request = AddToCart {
            product_id: product_id.clone(),
            quantity,
            variant_id: variant_id.cloned(),
        };
        let outcome = self.inner.api.add_item(&request).await;

        self.settle(ErrorScope::Product(product_id.clone()), outcome)
            .await
    }

    /// Remove a line.
    ///
    /// If the direct remove fails, the line is decremented one unit at a time
    /// down to zero before the failure is surfaced.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the line is not in the local cart, or the
    /// classified service error once both attempts failed.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: &CartItemId) -> Result<MutationStatus, CartError> {
        let Some(item) = self.item(item_id) else {
            return Err(CartError::NotFound(format!("Cart item {item_id}")));
        };

        let Some(_permit) = self.inner.guards.acquire(Guard::Deleting(item_id.clone())) else {
            debug!("Mutation already in flight for item, skipping delete");
            return Ok(MutationStatus::Skipped);
        };

        let outcome = match self.inner.api.remove_item(item_id).await {
            Ok(()) => Ok(()),
            Err(CartError::Unauthorized) => Err(CartError::Unauthorized),
            Err(primary) => {
                warn!(error = %primary, "Remove failed, retrying as decrement to zero");
                match self.decrement_by(item_id, item.quantity()).await {
                    Ok(()) => Ok(()),
                    Err(fallback) if fallback.is_unauthorized() => Err(fallback),
                    Err(fallback) => {
                        warn!(error = %fallback, "Decrement fallback failed");
                        Err(primary)
                    }
                }
            }
        };

        self.settle(ErrorScope::Item(item_id.clone()), outcome)
            .await
    }

    /// Increase a line's quantity by `amount`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero amount, `NotFound` if the line
    /// is not in the local cart, or the classified service error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn increase_quantity(
        &self,
        item_id: &CartItemId,
        amount: u32,
    ) -> Result<MutationStatus, CartError> {
        if amount == 0 {
            return Err(CartError::invalid_quantity("amount must be at least 1"));
        }
        let Some(item) = self.item(item_id) else {
            return Err(CartError::NotFound(format!("Cart item {item_id}")));
        };

        let Some(_permit) = self.inner.guards.acquire(Guard::Updating(item_id.clone())) else {
            debug!("Mutation already in flight for item, skipping increase");
            return Ok(MutationStatus::Skipped);
        };
        let _prediction = self
            .inner
            .overlay
            .predict(item_id.clone(), item.quantity().saturating_add(amount));

        let request = AddToCart {
            product_id: item.product_id.clone(),
            quantity: amount,
            variant_id: item.variant_id.clone(),
        };
        let outcome = self.inner.api.add_item(&request).await;

        self.settle(ErrorScope::Item(item_id.clone()), outcome)
            .await
    }

    /// Decrease a line's quantity by `amount`.
    ///
    /// A decrease that would leave zero or fewer units deletes the line
    /// instead of sending a decrement.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero amount, `NotFound` if the line
    /// is not in the local cart, or the classified service error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn decrease_quantity(
        &self,
        item_id: &CartItemId,
        amount: u32,
    ) -> Result<MutationStatus, CartError> {
        if amount == 0 {
            return Err(CartError::invalid_quantity("amount must be at least 1"));
        }
        let Some(item) = self.item(item_id) else {
            return Err(CartError::NotFound(format!("Cart item {item_id}")));
        };

        if item.quantity() <= amount {
            debug!("Decrease empties the line, deleting instead");
            return self.delete_item(item_id).await;
        }

        let Some(_permit) = self.inner.guards.acquire(Guard::Updating(item_id.clone())) else {
            debug!("Mutation already in flight for item, skipping decrease");
            return Ok(MutationStatus::Skipped);
        };
        let _prediction = self
            .inner
            .overlay
            .predict(item_id.clone(), item.quantity() - amount);

        let outcome = self.decrement_by(item_id, amount).await;

        self.settle(ErrorScope::Item(item_id.clone()), outcome)
            .await
    }

    /// Send `amount` single-unit decrements, stopping at the first failure.
    async fn decrement_by(&self, item_id: &CartItemId, amount: u32) -> Result<(), CartError> {
        for _ in 0..amount {
            self.inner.api.decrement_item(item_id).await?;
        }
        Ok(())
    }

    /// Finish a mutation: resync, then surface the mutation error if any.
    ///
    /// The resync runs even after a failed mutation. The mutation error takes
    /// precedence over a resync error, except that a 401 from either call
    /// collapses the cart.
    async fn settle(
        &self,
        scope: ErrorScope,
        outcome: Result<(), CartError>,
    ) -> Result<MutationStatus, CartError> {
        let resync = self.refresh().await;
        let result = match (outcome, resync) {
            (Err(e), _) if e.is_unauthorized() => Err(e),
            (_, Err(e)) if e.is_unauthorized() => Err(e),
            (Ok(()), resync) => resync,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(resync_err)) => {
                warn!(error = %resync_err, "Resync after failed mutation also failed");
                Err(e)
            }
        };

        match result {
            Ok(()) => {
                self.inner.errors.clear(&scope);
                Ok(MutationStatus::Applied)
            }
            Err(e) if e.is_unauthorized() => {
                self.collapse_to_guest();
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Cart mutation failed");
                self.inner.errors.record(scope, &e);
                Err(e)
            }
        }
    }
}
