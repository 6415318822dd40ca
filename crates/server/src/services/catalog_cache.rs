//! Product listing cache.
//!
//! Listing responses are cached per normalized query. Correctness does
//! not depend on expiry: every product or category mutation invalidates
//! the whole cache synchronously before its handler responds. The TTL on
//! entries is purely a memory bound.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use trellis_core::CategoryId;

use crate::models::product::ProductPage;

/// Maximum number of cached listing pages.
const MAX_ENTRIES: u64 = 1_000;

/// Entry lifetime. Not a correctness mechanism.
const ENTRY_TTL: Duration = Duration::from_secs(300);

/// Normalized cache key for one listing query.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ListingKey {
    page: u32,
    limit: i64,
    /// Sorted and deduplicated, so equivalent filters share an entry.
    category_ids: Option<Vec<CategoryId>>,
    is_available: Option<bool>,
}

impl ListingKey {
    /// Build a key, normalizing the category filter.
    #[must_use]
    pub fn new(
        page: u32,
        limit: i64,
        category_ids: Option<&[CategoryId]>,
        is_available: Option<bool>,
    ) -> Self {
        let category_ids = category_ids.map(|ids| {
            let mut ids = ids.to_vec();
            ids.sort_unstable();
            ids.dedup();
            ids
        });

        Self {
            page,
            limit,
            category_ids,
            is_available,
        }
    }
}

/// Cache of listing pages keyed by normalized query parameters.
#[derive(Clone)]
pub struct ListingCache {
    inner: Cache<ListingKey, Arc<ProductPage>>,
}

impl ListingCache {
    /// Create the cache with its standing capacity and TTL.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ENTRY_TTL)
                .build(),
        }
    }

    /// Look up a cached page.
    pub async fn get(&self, key: &ListingKey) -> Option<Arc<ProductPage>> {
        self.inner.get(key).await
    }

    /// Store a page.
    pub async fn insert(&self, key: ListingKey, page: Arc<ProductPage>) {
        self.inner.insert(key, page).await;
    }

    /// Drop every cached page. Called synchronously by each catalog
    /// mutation before the handler responds.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_page() -> Arc<ProductPage> {
        Arc::new(ProductPage {
            products: vec![],
            next_page: None,
        })
    }

    #[test]
    fn keys_normalize_category_order_and_duplicates() {
        let a = ListingKey::new(
            1,
            20,
            Some(&[CategoryId::new(3), CategoryId::new(1), CategoryId::new(3)]),
            None,
        );
        let b = ListingKey::new(1, 20, Some(&[CategoryId::new(1), CategoryId::new(3)]), None);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_filter_differs_from_empty_filter() {
        let none = ListingKey::new(1, 20, None, None);
        let empty = ListingKey::new(1, 20, Some(&[]), None);
        assert_ne!(none, empty);
    }

    #[tokio::test]
    async fn invalidation_clears_entries() {
        let cache = ListingCache::new();
        let key = ListingKey::new(1, 20, None, Some(true));

        cache.insert(key.clone(), empty_page()).await;
        assert!(cache.get(&key).await.is_some());

        cache.invalidate_all();
        // moka invalidates lazily; run_pending_tasks makes it observable.
        cache.inner.run_pending_tasks().await;
        assert!(cache.get(&key).await.is_none());
    }
}
