use serde::{Deserialize, Serialize};

/// Standard page envelope for admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i32,
    pub page_size: i32,
}

/// Clamp raw paging input: page is 1-based, page_size falls back to the
/// default and is capped.
pub fn clamp_paging(page: Option<i32>, page_size: Option<i32>, default_size: i32, max_size: i32) -> (i32, i32) {
    let page = match page {
        Some(p) if p > 0 => p,
        _ => 1,
    };
    let page_size = match page_size {
        Some(s) if s > 0 => s.min(max_size),
        _ => default_size,
    };
    (page, page_size)
}
