//! Pagination utilities for API responses.
//!
//! List endpoints accept `page` and `limit` query parameters:
//! - `limit`: Items per page (1-100, default: 10)
//! - `page`: Page number (1-indexed, default: 1)
//!
//! Responses carry a [`PaginationMeta`] next to the data:
//!
//! ```json
//! {
//!   "data": [...],
//!   "meta": { "total": 100, "limit": 10, "page": 3, "total_pages": 10, "has_more": true }
//! }
//! ```

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::serde::deserialize_optional_i64;

/// Metadata about a paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Total number of items across all pages
    pub total: i64,
    /// Maximum items per page (the limit that was applied)
    pub limit: i64,
    /// Current page number
    pub page: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Whether there are more items after this page
    pub has_more: bool,
}

impl PaginationMeta {
    #[must_use]
    pub fn new(params: &PaginationParams, total: i64) -> Self {
        let limit = params.limit();
        let page = params.page();
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

        Self {
            total,
            limit,
            page,
            total_pages,
            has_more: params.offset() + limit < total,
        }
    }
}

/// Query parameters for page-based pagination.
#[derive(Debug, Clone, Default, Hash, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed, default: 1)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    /// Maximum number of items to return (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
}

impl PaginationParams {
    #[must_use]
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }

    /// Returns the effective limit, clamped to [1, 100].
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    /// Returns the page number, clamped to a minimum of 1.
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params_default() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 10);
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_params_offset_from_page() {
        let params = PaginationParams::new(Some(3), Some(20));
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_pagination_params_limit_boundaries() {
        assert_eq!(PaginationParams::new(None, Some(0)).limit(), 1);
        assert_eq!(PaginationParams::new(None, Some(150)).limit(), 100);
        assert_eq!(PaginationParams::new(None, Some(-10)).limit(), 1);
    }

    #[test]
    fn test_pagination_params_negative_page() {
        let params = PaginationParams::new(Some(-2), Some(10));
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_meta_total_pages() {
        let params = PaginationParams::new(Some(1), Some(10));
        let meta = PaginationMeta::new(&params, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_more);

        let last = PaginationMeta::new(&PaginationParams::new(Some(3), Some(10)), 25);
        assert!(!last.has_more);
    }

    #[test]
    fn test_pagination_meta_empty() {
        let meta = PaginationMeta::new(&PaginationParams::default(), 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_more);
    }

    #[test]
    fn test_pagination_params_from_query_strings() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"page": "2", "limit": ""}"#).unwrap();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, None);
    }
}
