//! Fixed-size paging over directory listings.

/// Documents per page.
pub const PAGE_SIZE: usize = 10;

/// Normalises a raw `page` query value: missing, unparsable or < 1 gives 1.
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .map(|p| usize::try_from(p).unwrap_or(1))
        .unwrap_or(1)
}

/// Returns the slice of `items` shown on `page` (1-based).
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}
