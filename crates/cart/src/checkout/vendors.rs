//! Vendor lookups for line items whose vendor info is incomplete.
//!
//! Caches vendors using `moka` with the configured TTL. A failed lookup is
//! logged and the item stays unresolved; checkout still works with it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{CartLineItem, Vendor, VendorId};
use moka::future::Cache;
use tracing::{debug, instrument, warn};

use crate::client::CartApi;
use crate::config::CartConfig;

/// Cached vendor lookup over a [`CartApi`].
pub struct VendorDirectory<A> {
    inner: Arc<VendorDirectoryInner<A>>,
}

impl<A> Clone for VendorDirectory<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct VendorDirectoryInner<A> {
    api: A,
    cache: Cache<VendorId, Vendor>,
}

impl<A: CartApi> VendorDirectory<A> {
    /// Create a directory whose entries live for `ttl`.
    pub fn new(api: A, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(VendorDirectoryInner { api, cache }),
        }
    }

    /// Create a directory using the cache TTL from `config`.
    pub fn from_config(api: A, config: &CartConfig) -> Self {
        Self::new(api, config.vendor_cache_ttl)
    }

    /// Look up a vendor, returning `None` if the lookup fails.
    #[instrument(skip(self), fields(vendor_id = %vendor_id))]
    pub async fn lookup(&self, vendor_id: &VendorId) -> Option<Vendor> {
        if let Some(vendor) = self.inner.cache.get(vendor_id).await {
            debug!("Cache hit for vendor");
            return Some(vendor);
        }

        match self.inner.api.fetch_vendor(vendor_id).await {
            Ok(vendor) => {
                self.inner
                    .cache
                    .insert(vendor_id.clone(), vendor.clone())
                    .await;
                Some(vendor)
            }
            Err(e) => {
                warn!(error = %e, "Vendor lookup failed, leaving vendor unresolved");
                None
            }
        }
    }

    /// Copy of `items` with missing vendor names and districts filled in.
    ///
    /// Each distinct unresolved vendor is looked up once.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn resolve(&self, items: &[CartLineItem]) -> Vec<CartLineItem> {
        let mut seen = HashSet::new();
        let mut vendors = Vec::new();
        for item in items.iter().filter(|item| !item.vendor.is_resolved()) {
            if seen.insert(item.vendor_id().clone())
                && let Some(vendor) = self.lookup(item.vendor_id()).await
            {
                vendors.push(vendor);
            }
        }

        items
            .iter()
            .cloned()
            .map(|mut item| {
                if let Some(vendor) = vendors.iter().find(|v| v.id == item.vendor.id) {
                    item.vendor.fill_from(vendor);
                }
                item
            })
            .collect()
    }

    /// Drop every cached vendor.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{Call, FakeCartApi, line, vendor};
    use bazaar_core::VendorRef;

    fn unresolved(id: &str) -> VendorRef {
        VendorRef::unresolved(VendorId::new(id))
    }

    fn directory(api: &Arc<FakeCartApi>) -> VendorDirectory<Arc<FakeCartApi>> {
        VendorDirectory::new(Arc::clone(api), Duration::from_secs(60))
    }

    fn vendor_lookups(api: &FakeCartApi) -> usize {
        api.calls()
            .iter()
            .filter(|c| matches!(c, Call::FetchVendor(_)))
            .count()
    }

    #[tokio::test]
    async fn test_resolve_fills_missing_fields() {
        let api = Arc::new(FakeCartApi::new().with_vendor("v1", "Thamel Textiles", "Kathmandu"));
        let items = vec![
            line("a", 100, 1, unresolved("v1")),
            line("b", 100, 1, unresolved("v1")),
        ];

        let resolved = directory(&api).resolve(&items).await;

        assert!(resolved.iter().all(|i| i.vendor.is_resolved()));
        assert_eq!(
            resolved[0].vendor.business_name.as_deref(),
            Some("Thamel Textiles")
        );
        assert_eq!(vendor_lookups(&api), 1);
    }

    #[tokio::test]
    async fn test_lookups_are_cached() {
        let api = Arc::new(FakeCartApi::new().with_vendor("v1", "Thamel Textiles", "Kathmandu"));
        let directory = directory(&api);

        directory.lookup(&VendorId::new("v1")).await.unwrap();
        directory.lookup(&VendorId::new("v1")).await.unwrap();
        assert_eq!(vendor_lookups(&api), 1);

        directory.invalidate_all().await;
        directory.lookup(&VendorId::new("v1")).await.unwrap();
        assert_eq!(vendor_lookups(&api), 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_leaves_item_unresolved() {
        let api = Arc::new(FakeCartApi::new());
        let items = vec![line("a", 100, 1, unresolved("missing"))];

        let resolved = directory(&api).resolve(&items).await;

        assert_eq!(resolved, items);
    }

    #[tokio::test]
    async fn test_resolved_items_skip_lookup() {
        let api = Arc::new(FakeCartApi::new());
        let items = vec![line("a", 100, 1, vendor("v1", "Thamel Textiles", "Kathmandu"))];

        let resolved = directory(&api).resolve(&items).await;

        assert_eq!(resolved, items);
        assert_eq!(vendor_lookups(&api), 0);
    }
}
