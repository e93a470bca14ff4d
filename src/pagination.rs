//! Pagination over already-filtered lists
//!
//! Pure slicing: callers filter and sort first, then page. Out-of-range
//! page requests clamp instead of erroring, so stale page state in a view
//! layer can never produce a blank screen.

use serde::Serialize;

/// One page of a larger list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served, after clamping.
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice `items` into the requested 1-based page.
///
/// Requests below 1 serve the first page; requests past the end serve the
/// last. An empty list yields a single empty page.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, requested_page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = requested_page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let items = if start < total_items {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items,
        page,
        page_size,
        total_pages,
        total_items,
    }
}
