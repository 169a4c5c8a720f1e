use serde::{Deserialize, Serialize};

/// Pagination envelope attached to every list response.
///
/// Only the first page is ever requested; `next_page` is kept so callers can
/// tell when a listing is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub next_page: Option<u32>,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
