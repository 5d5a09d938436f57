//! Product listing types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A product as shown in listings and on the product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductSummary {
    /// Whether the product is marked down from its compare-at price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|was| was > self.price)
    }
}

/// Query parameters for `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductQuery {
    /// Cache key for this query. Search queries return `None` and are never cached.
    #[must_use]
    pub fn cache_key(&self) -> Option<String> {
        if self.search.is_some() {
            return None;
        }
        Some(format!(
            "products:{}:{}:{}",
            self.page.unwrap_or(1),
            self.limit.unwrap_or(0),
            self.category.as_deref().unwrap_or("")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_queries_have_no_cache_key() {
        let query = ProductQuery {
            search: Some("saree".to_string()),
            ..ProductQuery::default()
        };
        assert_eq!(query.cache_key(), None);
    }

    #[test]
    fn test_cache_key_distinguishes_pages() {
        let first = ProductQuery::default();
        let second = ProductQuery {
            page: Some(2),
            ..ProductQuery::default()
        };
        assert_ne!(first.cache_key(), second.cache_key());
    }
}
