//! Page/limit windowing shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Default number of items per page.
pub const DEFAULT_PAGE_LIMIT: i64 = 25;

/// Maximum number of items per page.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
///
/// A limit of zero (or below) is raised to one so that neither the skip
/// computation nor the page count can divide by zero.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided 1-indexed page number.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed page number.
    pub page: i64,
    /// Items per page, always `>= 1`.
    pub limit: i64,
}

impl PageRequest {
    /// Build a window from raw query values using the default bounds.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: clamp_page(page),
            limit: clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
        }
    }

    /// Number of items to skip: `(page - 1) * limit`.
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned alongside every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

impl Pagination {
    /// Metadata for `total` matching items viewed through `request`.
    pub fn new(total: i64, request: PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            pages: page_count(total, request.limit),
        }
    }
}

/// `ceil(total / limit)`, with a non-positive limit treated as one.
pub fn page_count(total: i64, limit: i64) -> i64 {
    let limit = limit.max(1);
    let total = total.max(0);
    (total + limit - 1) / limit
}

/// One page of items plus its metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_uses_default_when_none() {
        assert_eq!(clamp_limit(None, 25, 100), 25);
    }

    #[test]
    fn clamp_limit_respects_max() {
        assert_eq!(clamp_limit(Some(500), 25, 100), 100);
    }

    #[test]
    fn clamp_limit_floors_at_one() {
        assert_eq!(clamp_limit(Some(0), 25, 100), 1);
        assert_eq!(clamp_limit(Some(-3), 25, 100), 1);
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(-7)), 1);
        assert_eq!(clamp_page(Some(4)), 4);
    }

    #[test]
    fn skip_is_zero_on_first_page() {
        assert_eq!(PageRequest::new(Some(1), Some(25)).skip(), 0);
    }

    #[test]
    fn skip_for_later_pages() {
        assert_eq!(PageRequest::new(Some(3), Some(10)).skip(), 20);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(30, 25), 2);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
    }

    #[test]
    fn page_count_of_empty_collection_is_zero() {
        assert_eq!(page_count(0, 25), 0);
    }

    #[test]
    fn page_count_guards_zero_limit() {
        assert_eq!(page_count(7, 0), 7);
    }

    #[test]
    fn metadata_matches_request() {
        let meta = Pagination::new(30, PageRequest::new(Some(2), Some(25)));
        assert_eq!(meta, Pagination { total: 30, page: 2, pages: 2 });
    }

    #[test]
    fn pages_is_ceil_for_many_combinations() {
        for total in 0..60 {
            for limit in 1..30 {
                let pages = page_count(total, limit);
                assert!(pages * limit >= total);
                assert!(pages == 0 || (pages - 1) * limit < total);
            }
        }
    }
}
