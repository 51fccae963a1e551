//! Shared query parameter and request body types for API handlers.

use serde::Deserialize;
use eduboard_core::pagination::PageRequest;

/// Paging, sorting and ownership parameters accepted by every list endpoint
/// (`?page=&limit=&sort=&mine=`). Entity filters are extracted separately.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// `created_at`, `sequence` or `updated_at`, `-` prefix for descending.
    pub sort: Option<String>,
    /// Restrict to records owned by the caller.
    #[serde(default)]
    pub mine: bool,
}

impl ListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Query parameters for `GET /api/admin/outbox`.
#[derive(Debug, Default, Deserialize)]
pub struct OutboxListParams {
    /// `pending`, `in_flight`, `sent` or `dead`.
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Body of `PUT /api/<entity>/reorder`.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Canonical ids in the desired display order.
    pub ordered_ids: Vec<String>,
}
