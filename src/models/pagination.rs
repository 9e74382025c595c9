//! Page-number pagination for feeds

use serde::{Deserialize, Serialize};

/// Number of posts shown on one page of any feed
pub const POSTS_PER_PAGE: u32 = 10;

/// Pagination parameters resolved against a known item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: POSTS_PER_PAGE,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Parse the raw `?page=` value. Anything that is not an integer means page 1.
    pub fn requested_page(raw: Option<&str>) -> i64 {
        raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(1)
    }

    /// Resolve a raw `?page=` value for a result set of `total` items.
    ///
    /// Non-integer input selects page 1. A number below 1 or past the last
    /// page selects the last page. An empty result set still has page 1.
    pub fn resolve(raw: Option<&str>, total: i64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let last = num_pages(total, per_page);
        let requested = Self::requested_page(raw);
        let page = if requested < 1 || requested > i64::from(last) {
            last
        } else {
            requested as u32
        };
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Number of pages needed for `total` items; never less than one.
pub fn num_pages(total: i64, per_page: u32) -> u32 {
    let per_page = i64::from(per_page.max(1));
    let total = total.max(0);
    let pages = (total + per_page - 1) / per_page;
    pages.clamp(1, i64::from(u32::MAX)) as u32
}

/// One page of a result set, with the navigation state templates need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub number: u32,
    pub per_page: u32,
    pub num_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let num_pages = num_pages(total, params.per_page);
        Self {
            items,
            total,
            number: params.page,
            per_page: params.per_page,
            num_pages,
            has_next: params.page < num_pages,
            has_previous: params.page > 1,
        }
    }
}
