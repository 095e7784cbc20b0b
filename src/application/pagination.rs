//! Page-number pagination over an ordered, fully materialized collection.
//!
//! The feed read path works on in-memory collections (the cached feed or a
//! filtered query result), so pagination is plain slice math: a 1-based page
//! number, a fixed page size, and clamping instead of range errors.

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A 1-based page number. Missing, malformed, or non-positive input falls
/// back to the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(usize);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    pub fn parse(raw: Option<&str>) -> Self {
        let number = raw
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&value| value >= 1)
            .unwrap_or(1);
        PageNumber(number)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// One page of an ordered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total_count: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Slice out the requested page. Out-of-range numbers clamp to the last
    /// valid page; an empty collection yields a single empty page.
    pub fn page<T: Clone>(&self, items: &[T], requested: PageNumber) -> Page<T> {
        let total_count = items.len();
        let num_pages = total_count.div_ceil(self.page_size).max(1);
        let number = requested.get().min(num_pages);
        let start = (number - 1) * self.page_size;
        let end = (start + self.page_size).min(total_count);
        let items = if start < total_count {
            items[start..end].to_vec()
        } else {
            Vec::new()
        };
        Page {
            items,
            number,
            num_pages,
            total_count,
        }
    }
}
