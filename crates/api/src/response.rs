//! Shared response envelope types for API handlers.
//!
//! Single records use a `{ "data": ... }` envelope ([`DataResponse`]); list
//! endpoints use `{ "<list key>": [...], "pagination": {...} }` ([`ListResponse`]).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use eduboard_core::pagination::{Page, Pagination};

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: record }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Paginated list envelope keyed by the collection's list key, e.g.
/// `{ "teachers": [...], "pagination": { "total", "page", "pages" } }`.
#[derive(Debug)]
pub struct ListResponse<T> {
    pub key: &'static str,
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> ListResponse<T> {
    pub fn new(key: &'static str, page: Page<T>) -> Self {
        Self {
            key,
            items: page.items,
            pagination: page.pagination,
        }
    }
}

impl<T: Serialize> Serialize for ListResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}
