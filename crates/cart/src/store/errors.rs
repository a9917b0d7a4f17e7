//! Item-scoped error surface.
//!
//! A failed mutation leaves one entry keyed by the identity it targeted.
//! Entries expire after a fixed window and never block operations on other
//! identities. A newer failure for the same identity replaces the older one
//! and restarts its window.

use std::time::{Duration, Instant};

use bazaar_core::{CartItemId, ProductId};
use moka::sync::Cache;

use crate::error::{CartError, ErrorKind};

/// Upper bound on simultaneously surfaced errors.
const MAX_ENTRIES: u64 = 1_000;

/// The identity an error is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    /// A failed add, keyed by product.
    Product(ProductId),
    /// A failed delete or quantity change, keyed by cart item.
    Item(CartItemId),
}

/// A surfaced mutation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub scope: ErrorScope,
    pub kind: ErrorKind,
    pub message: String,
    pub raised_at: Instant,
}

/// Expiring map of item errors, backed by a `moka` cache with a
/// time-to-live of one window.
#[derive(Debug)]
pub struct ErrorBoard {
    window: Duration,
    entries: Cache<ErrorScope, ItemError>,
}

impl ErrorBoard {
    /// Create a board whose entries stay visible for `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(window)
            .build();
        Self { window, entries }
    }

    /// How long entries stay visible.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Surface `error` for `scope`, starting its window now.
    pub fn record(&self, scope: ErrorScope, error: &CartError) {
        let entry = ItemError {
            scope: scope.clone(),
            kind: error.kind(),
            message: error.to_string(),
            raised_at: Instant::now(),
        };
        self.entries.insert(scope, entry);
    }

    /// Drop the entry for `scope`, if any.
    pub fn clear(&self, scope: &ErrorScope) {
        self.entries.invalidate(scope);
    }

    /// The visible error for `scope`.
    #[must_use]
    pub fn get(&self, scope: &ErrorScope) -> Option<ItemError> {
        self.entries.get(scope)
    }

    /// All errors visible right now, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<ItemError> {
        let mut active: Vec<ItemError> = self.entries.iter().map(|(_, entry)| entry).collect();
        active.sort_by_key(|entry| entry.raised_at);
        active
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::thread::sleep;

    fn stock_error() -> CartError {
        CartError::from_status(StatusCode::BAD_REQUEST, "Out of stock".to_string(), None)
    }

    #[test]
    fn test_errors_expire_after_window() {
        let board = ErrorBoard::new(Duration::from_millis(100));
        let scope = ErrorScope::Item(CartItemId::new("c1"));

        board.record(scope.clone(), &stock_error());

        let visible = board.get(&scope);
        assert_eq!(visible.map(|e| e.kind), Some(ErrorKind::StockLimit));

        sleep(Duration::from_millis(200));
        assert!(board.get(&scope).is_none());
        assert!(board.active().is_empty());
    }

    #[test]
    fn test_newer_error_replaces_older() {
        let board = ErrorBoard::new(Duration::from_millis(300));
        let scope = ErrorScope::Product(ProductId::new("p1"));

        board.record(scope.clone(), &stock_error());
        sleep(Duration::from_millis(200));
        board.record(
            scope.clone(),
            &CartError::from_status(StatusCode::BAD_GATEWAY, "upstream".to_string(), None),
        );
        sleep(Duration::from_millis(200));

        let active = board.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, ErrorKind::Mutation);
    }

    #[test]
    fn test_errors_are_independent_per_scope() {
        let board = ErrorBoard::new(Duration::from_secs(5));
        let a = ErrorScope::Item(CartItemId::new("a"));
        let b = ErrorScope::Item(CartItemId::new("b"));
        let c = ErrorScope::Item(CartItemId::new("c"));

        board.record(a.clone(), &stock_error());
        board.record(b.clone(), &stock_error());
        sleep(Duration::from_millis(5));
        board.record(c.clone(), &stock_error());
        board.clear(&a);

        let active = board.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].scope, b);
        assert_eq!(active[1].scope, c);
    }
}
