use serde::Serialize;

use teamflow_core::{DomainError, DomainResult};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_size: u64,
    page_number: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_number: DEFAULT_PAGE_NUMBER,
        }
    }
}

impl PageRequest {
    pub fn new(page_size: u64, page_number: u64) -> DomainResult<Self> {
        if page_size == 0 {
            return Err(DomainError::validation("pageSize must be at least 1"));
        }
        if page_number == 0 {
            return Err(DomainError::validation("pageNumber must be at least 1"));
        }
        Ok(Self {
            page_size,
            page_number,
        })
    }

    /// Missing values fall back to the defaults (10 per page, first page).
    pub fn from_query(page_size: Option<u64>, page_number: Option<u64>) -> DomainResult<Self> {
        Self::new(
            page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            page_number.unwrap_or(DEFAULT_PAGE_NUMBER),
        )
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn skip(&self) -> u64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }
}

/// One page of results plus the arithmetic clients need to navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub total_pages: u64,
    pub page_size: u64,
    pub page_number: u64,
    pub skip: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            total_pages: total_count.div_ceil(request.page_size),
            page_size: request.page_size,
            page_number: request.page_number,
            skip: request.skip(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn third_page_of_twenty_five() {
        let req = PageRequest::new(10, 3).unwrap();
        assert_eq!(req.skip(), 20);

        let page = Page::new(vec![(); 5], 25, req);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn defaults_and_zero_rejection() {
        let req = PageRequest::from_query(None, None).unwrap();
        assert_eq!((req.page_size(), req.page_number(), req.skip()), (10, 1, 0));

        assert!(PageRequest::new(0, 1).is_err());
        assert!(PageRequest::new(10, 0).is_err());
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: Page<u8> = Page::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(page.total_pages, 0);
    }

    proptest! {
        /// Property: total_pages is the smallest page count covering every item.
        #[test]
        fn total_pages_covers_all_items(total in 0u64..10_000, size in 1u64..200) {
            let page: Page<()> = Page::new(Vec::new(), total, PageRequest::new(size, 1).unwrap());
            prop_assert!(page.total_pages * size >= total);
            if page.total_pages > 0 {
                prop_assert!((page.total_pages - 1) * size < total);
            }
        }
    }
}
