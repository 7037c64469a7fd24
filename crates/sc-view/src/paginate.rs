//! Client-side pagination with a fixed page size.

use serde::Serialize;

/// Where the current page sits in the filtered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// 1-based page index.
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    /// Filtered record count.
    pub total: usize,
}

/// 1-based page cursor that stays in range as the result shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    page: usize,
}

impl Paginator {
    /// A page size of 0 is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages needed for `len` records; an empty result still has page 1.
    pub fn page_count(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    /// Jump to `page`, clamped into `[1, page_count(len)]`.
    pub fn set_page(&mut self, page: usize, len: usize) {
        self.page = page.clamp(1, self.page_count(len));
    }

    /// Re-clamp after the filtered length changed.
    pub fn clamp(&mut self, len: usize) {
        let count = self.page_count(len);
        if self.page > count {
            tracing::trace!(from = self.page, to = count, "page clamped");
            self.page = count;
        }
    }

    /// Clamp to `items.len()` and return the current page's slice.
    pub fn slice<'a, T>(&mut self, items: &'a [T]) -> &'a [T] {
        self.clamp(items.len());
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(items.len());
        items.get(start..end).unwrap_or(&[])
    }

    pub fn info(&self, len: usize) -> PageInfo {
        PageInfo {
            page: self.page,
            page_count: self.page_count(len),
            page_size: self.page_size,
            total: len,
        }
    }
}
