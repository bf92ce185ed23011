//! Pagination slicer

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Selectable page sizes
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 20, 50, 100];

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// 1-based page position over a filtered sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page: usize,
    size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Number of pages for `total` rows; never less than one
pub fn page_count(total: usize, size: usize) -> usize {
    if size == 0 {
        return 1;
    }
    total.div_ceil(size).max(1)
}

/// The rows of page `page` (1-based), i.e. `[(page-1)*size, page*size)`
pub fn slice<T>(rows: &[T], page: usize, size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(size).min(rows.len());
    let end = start.saturating_add(size).min(rows.len());
    &rows[start..end]
}

impl Pagination {
    pub fn new(size: usize) -> Result<Self> {
        let mut pagination = Self::default();
        pagination.set_size(size)?;
        Ok(pagination)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Change the page size; only the fixed options are accepted. Resets to page 1.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if !PAGE_SIZE_OPTIONS.contains(&size) {
            return Err(Error::Validation(format!(
                "page size {} is not one of {:?}",
                size, PAGE_SIZE_OPTIONS
            )));
        }
        self.size = size;
        self.page = 1;
        Ok(())
    }

    pub fn go_to(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn next(&mut self, total: usize) {
        if self.page < page_count(total, self.size) {
            self.page += 1;
        }
    }

    pub fn previous(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// The page to display for `total` rows
    pub fn clamped(&self, total: usize) -> usize {
        self.page.clamp(1, page_count(total, self.size))
    }

    /// Store the clamped page back
    pub fn clamp_to(&mut self, total: usize) {
        self.page = self.clamped(total);
    }
}
