//! Product catalog reads.
//!
//! Listings and product pages are cached with `moka` for the configured TTL
//! (5 minutes by default). Search results are never cached.

use std::sync::Arc;

use ecom_core::{PageMeta, ProductQuery, ProductSummary};
use moka::future::Cache;
use reqwest::Method;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::http::{ApiClient, RequestOptions};

const CACHE_CAPACITY: u64 = 1000;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: Option<PageMeta>,
}

impl<T> Page<T> {
    /// Whether the server reported a further page.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.meta.as_ref().is_some_and(PageMeta::has_next)
    }
}

#[derive(Clone)]
enum CacheValue {
    Product(Box<ProductSummary>),
    Products(Page<ProductSummary>),
}

/// Read-only catalog client with a response cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    api: ApiClient,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(api.config().catalog_cache_ttl)
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { api, cache }),
        }
    }

    /// List products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<ProductSummary>> {
        let cache_key = query.cache_key();

        if let Some(key) = &cache_key
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.inner.api.config().endpoint("products")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if let Some(category) = &query.category {
                pairs.append_pair("category", category);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response = self
            .inner
            .api
            .send_url::<Vec<ProductSummary>, ()>(Method::GET, url, None, RequestOptions::public())
            .await?;
        let page = Page {
            items: response.data,
            meta: response.meta,
        };

        if let Some(key) = cache_key {
            self.inner
                .cache
                .insert(key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` from the API for an unknown slug.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product(&self, slug: &str) -> Result<ProductSummary> {
        let cache_key = format!("product:{slug}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.inner.api.resource_url("products", slug)?;
        let product = self
            .inner
            .api
            .send_url::<ProductSummary, ()>(Method::GET, url, None, RequestOptions::public())
            .await?
            .data;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop every cached response.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_has_next() {
        let page: Page<ProductSummary> = Page {
            items: Vec::new(),
            meta: Some(PageMeta::new(1, 20, 45)),
        };
        assert!(page.has_next());

        let last: Page<ProductSummary> = Page {
            items: Vec::new(),
            meta: Some(PageMeta::new(3, 20, 45)),
        };
        assert!(!last.has_next());
        assert!(!Page::<ProductSummary> { items: Vec::new(), meta: None }.has_next());
    }
}
