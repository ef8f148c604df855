//! Pagination utilities for mspec-ingest
//!
//! List queries accept either `limit`/`offset` or `page`/`per_page`. When
//! both styles are present, `limit`/`offset` wins.

use serde::Deserialize;

/// Page size used when the request gives none
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Raw pagination parameters from the query string
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Resolved LIMIT/OFFSET window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

/// Resolve request parameters into a window capped at `max_page_size`
///
/// # Examples
/// ```
/// use mspec_ingest::pagination::{resolve_window, PageParams, Window};
///
/// let params = PageParams { page: Some(3), per_page: Some(20), ..Default::default() };
/// assert_eq!(resolve_window(params, 100), Window { limit: 20, offset: 40 });
///
/// // Oversized pages are capped
/// let params = PageParams { limit: Some(500), ..Default::default() };
/// assert_eq!(resolve_window(params, 100), Window { limit: 100, offset: 0 });
/// ```
pub fn resolve_window(params: PageParams, max_page_size: i64) -> Window {
    let cap = |size: i64| size.clamp(1, max_page_size.max(1));

    if params.limit.is_some() || params.offset.is_some() {
        return Window {
            limit: cap(params.limit.unwrap_or(DEFAULT_PAGE_SIZE)),
            offset: params.offset.unwrap_or(0).max(0),
        };
    }

    let per_page = cap(params.per_page.unwrap_or(DEFAULT_PAGE_SIZE));
    let page = params.page.unwrap_or(1).max(1);
    Window {
        limit: per_page,
        offset: (page - 1).saturating_mul(per_page),
    }
}
