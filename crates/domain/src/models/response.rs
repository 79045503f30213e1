//! Success envelope shared by every JSON endpoint.

use serde::Serialize;

/// `{ "ok": true, "data": ... }`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// Offset-paginated list body used by admin endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
