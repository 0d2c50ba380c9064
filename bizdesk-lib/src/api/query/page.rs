//! Range and page types for paginated reads.

/// An offset/limit window sent as `offset` and `limit` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: usize,
    pub limit: usize,
}

impl Range {
    /// Creates a range from an offset and a limit.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Window for a 1-based page number.
    pub fn page(page: usize, page_size: usize) -> Self {
        Self {
            offset: page.saturating_sub(1) * page_size,
            limit: page_size,
        }
    }
}

/// A page of query results.
///
/// `total_count` is filled from the `Content-Range` response header when the
/// query asked for an exact count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    items: Vec<T>,
    offset: usize,
    total_count: Option<usize>,
}

impl<T> Page<T> {
    /// Creates a new page.
    pub fn new(items: Vec<T>, offset: usize, total_count: Option<usize>) -> Self {
        Self {
            items,
            offset,
            total_count,
        }
    }

    /// Returns the items in this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the page and returns the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Offset of the first item in this page.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the total row count, if it was requested.
    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    /// Returns `true` if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if more rows exist past this page.
    ///
    /// Without a total count, a full page is assumed to have a successor.
    pub fn has_more(&self, page_size: usize) -> bool {
        match self.total_count {
            Some(total) => self.offset + self.items.len() < total,
            None => self.items.len() == page_size && page_size > 0,
        }
    }
}

/// Parses the total from a `Content-Range` header such as `0-9/42` or `*/0`.
pub(crate) fn parse_content_range(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-9/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
    }

    #[test]
    fn test_range_page() {
        assert_eq!(Range::page(1, 10), Range::new(0, 10));
        assert_eq!(Range::page(3, 25), Range::new(50, 25));
        assert_eq!(Range::page(0, 10), Range::new(0, 10));
    }

    #[test]
    fn test_has_more() {
        let page = Page::new(vec![1, 2, 3], 0, Some(5));
        assert!(page.has_more(3));
        let last = Page::new(vec![4, 5], 3, Some(5));
        assert!(!last.has_more(3));
        let unknown = Page::new(vec![1, 2, 3], 0, None);
        assert!(unknown.has_more(3));
    }
}
