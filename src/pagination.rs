//! This modules defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items to display per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl PaginationConfig {
    /// The page size to use for a request, clamped to `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }

    /// The page number to use for a request.
    pub fn page(&self, requested: Option<u64>) -> u64 {
        requested.unwrap_or(self.default_page)
    }
}

/// Where a page sits among all the pages of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// The current page, starting from 1.
    pub page: u64,
    /// The maximum number of items per page.
    pub page_size: u64,
    /// The number of items across all pages.
    pub total: u64,
    /// The number of pages, at least 1 even if there are no items.
    pub pages: u64,
    /// Whether there is a page before this one.
    pub has_prev: bool,
    /// Whether there is a page after this one.
    pub has_next: bool,
}

impl PageWindow {
    /// The number of items before the first item of this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// The maximum number of items on this page.
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// A page of items and its [PageWindow].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// The items on this page, in display order.
    pub items: Vec<T>,
    /// The position of this page in the result set.
    #[serde(flatten)]
    pub window: PageWindow,
}

/// Work out which page to show out of `total` items.
///
/// A `page_size` of 0 is treated as 1. `page` is clamped to the pages that
/// exist, so asking for page 0 gives the first page and asking past the end
/// gives the last page.
pub fn paginate(total: u64, page: u64, page_size: u64) -> PageWindow {
    let page_size = page_size.max(1);
    let pages = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, pages);

    PageWindow {
        page,
        page_size,
        total,
        pages,
        has_prev: page > 1,
        has_next: page < pages,
    }
}
