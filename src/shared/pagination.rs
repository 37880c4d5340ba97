//! Page-based pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Keeps `offset()` far from overflow.
pub const MAX_PAGE: i64 = 1_000_000;

/// Normalized page request (1-based page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Clamp raw query values into a usable request.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Row offset for SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination block returned next to every list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: (total + request.limit - 1) / request.limit,
        }
    }
}

/// A page of items plus its pagination block.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, None, 1, 10 ; "defaults")]
    #[test_case(Some(0), Some(0), 1, 1 ; "zero clamps up")]
    #[test_case(Some(-3), Some(500), 1, 100 ; "limit clamps down")]
    #[test_case(Some(4), Some(25), 4, 25 ; "passthrough")]
    #[test_case(Some(i64::MAX), Some(10), MAX_PAGE, 10 ; "huge page clamps down")]
    fn test_page_request_clamping(page: Option<i64>, limit: Option<i64>, want_page: i64, want_limit: i64) {
        let req = PageRequest::new(page, limit);
        assert_eq!(req.page, want_page);
        assert_eq!(req.limit, want_limit);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn test_offset_of_huge_page_stays_positive() {
        let req = PageRequest::new(Some(i64::MAX), Some(MAX_PAGE_SIZE));
        assert_eq!(req.offset(), (MAX_PAGE - 1) * MAX_PAGE_SIZE);
    }

    #[test_case(0, 0 ; "empty")]
    #[test_case(1, 1 ; "single")]
    #[test_case(10, 1 ; "exact page")]
    #[test_case(11, 2 ; "spills over")]
    fn test_pages(total: i64, pages: i64) {
        let p = Pagination::new(PageRequest::default(), total);
        assert_eq!(p.pages, pages);
        assert_eq!(p.total, total);
    }
}
