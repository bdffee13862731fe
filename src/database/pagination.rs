use serde::Serialize;

use super::{error::ApiError, form::PageQuery};
use crate::constants::MAX_PAGE_SIZE;

/// Resolved page window. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// `limit` overrides `default_size` and is clamped into `1..=MAX_PAGE_SIZE`.
    pub fn resolve(query: PageQuery, default_size: i64) -> Result<Self, ApiError> {
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(ApiError::NotFound(String::from("Invalid page.")));
        }
        let page_size = query
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);

        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Result<Self, ApiError> {
        if rows.is_empty() {
            if request.page > 1 {
                return Err(ApiError::NotFound(String::from("Invalid page.")));
            }
            return Ok(Self::no_rows());
        }

        let next = if request.offset() + (rows.len() as i64) < total_rows {
            Some(request.page + 1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: Option<i64>, limit: Option<i64>) -> PageRequest {
        PageRequest::resolve(PageQuery { page, limit }, 6).unwrap()
    }

    #[test]
    fn defaults_to_first_page_of_default_size() {
        let request = request(None, None);
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 6);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn limit_overrides_page_size() {
        let request = request(Some(3), Some(10));
        assert_eq!(request.page_size, 10);
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn oversized_limit_is_clamped() {
        assert_eq!(request(None, Some(10_000)).page_size, MAX_PAGE_SIZE);
        assert_eq!(request(None, Some(0)).page_size, 6);
    }

    #[test]
    fn zero_page_is_rejected() {
        let result = PageRequest::resolve(
            PageQuery {
                page: Some(0),
                limit: None,
            },
            6,
        );
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn middle_page_links_both_ways() {
        let page = Page::from_rows(vec![1, 2], 6, request(Some(2), Some(2))).unwrap();
        assert_eq!(page.count, 6);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::from_rows(vec![5], 5, request(Some(3), Some(2))).unwrap();
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(2));
    }

    #[test]
    fn empty_first_page_is_not_an_error() {
        let page: Page<i32> = Page::from_rows(vec![], 0, request(None, None)).unwrap();
        assert_eq!(page, Page::no_rows());
    }

    #[test]
    fn empty_page_past_the_end_is_invalid() {
        let result: Result<Page<i32>, _> = Page::from_rows(vec![], 0, request(Some(4), None));
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
