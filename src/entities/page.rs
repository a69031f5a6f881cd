use serde::{Deserialize, Serialize};

use crate::error::{invalid_input_error, Error};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based page index and page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Result<Self, Error> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(invalid_input_error(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(Self { page, size })
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            total_elements,
        }
    }

    /// Slices one page out of an already ordered match set.
    pub fn from_ordered(all: Vec<T>, request: &PageRequest) -> Self {
        let total_elements = all.len() as u64;
        let content = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.size as usize)
            .collect();

        Self::new(content, request, total_elements)
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }

        (self.total_elements + self.size as u64 - 1) / self.size as u64
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        self.number as u64 + 1 >= self.total_pages()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

#[test]
fn page_request_bounds() {
    assert!(PageRequest::new(0, 1).is_ok());
    assert!(PageRequest::new(3, MAX_PAGE_SIZE).is_ok());
    assert_eq!(PageRequest::new(0, 0).unwrap_err().code, 101);
    assert_eq!(PageRequest::new(0, 101).unwrap_err().code, 101);

    let request = PageRequest::new(2, 25).unwrap();
    assert_eq!(request.offset(), 50);
    assert_eq!(request.limit(), 25);
}

#[test]
fn page_slices_ordered_results() {
    let items: Vec<u32> = (0..5).collect();

    let first = Page::from_ordered(items.clone(), &PageRequest::new(0, 2).unwrap());
    let last = Page::from_ordered(items.clone(), &PageRequest::new(2, 2).unwrap());
    let beyond = Page::from_ordered(items, &PageRequest::new(9, 2).unwrap());

    assert_eq!(first.content, vec![0, 1]);
    assert!(first.is_first() && !first.is_last());
    assert_eq!(first.total_pages(), 3);

    assert_eq!(last.content, vec![4]);
    assert!(last.is_last());

    assert!(beyond.content.is_empty());
    assert_eq!(beyond.total_elements, 5);
}
