use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query-string pagination parameters shared by list endpoints.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// 1-based page, clamped to sane bounds.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, query: &PageQuery, total: i64) -> Self {
        Self {
            items,
            page: query.page(),
            per_page: query.per_page(),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), DEFAULT_PAGE_SIZE);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_page_clamping() {
        let q = PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), MAX_PAGE_SIZE);

        let q = PageQuery {
            page: Some(3),
            per_page: Some(25),
        };
        assert_eq!(q.offset(), 50);
    }
}
