//! Success envelope shared by every storefront endpoint.

use serde::{Deserialize, Serialize};

/// `{ data, meta }` wrapper around successful responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload without pagination metadata.
    pub const fn new(data: T) -> Self {
        Self { data, meta: None }
    }

    /// Wrap a payload with pagination metadata.
    pub const fn paged(data: T, meta: PageMeta) -> Self {
        Self {
            data,
            meta: Some(meta),
        }
    }
}

/// Pagination metadata for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl PageMeta {
    /// Build metadata for `total` records split into pages of `limit`.
    #[must_use]
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_meta_rounds_up() {
        let meta = PageMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next());
        assert!(!PageMeta::new(3, 20, 41).has_next());
    }

    #[test]
    fn test_envelope_without_meta() {
        let parsed: ApiResponse<Vec<u32>> = serde_json::from_str(r#"{"data":[1,2]}"#).unwrap();
        assert_eq!(parsed.data, vec![1, 2]);
        assert!(parsed.meta.is_none());

        let json = serde_json::to_string(&ApiResponse::new(7)).unwrap();
        assert_eq!(json, r#"{"data":7}"#);
    }
}
