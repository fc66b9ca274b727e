//! Page slicing for dashboard tables.

use crate::{Error, Result};

use serde::{Deserialize, Serialize};

/// Page sizes offered by the dashboard tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    /// 10 rows
    #[default]
    Ten,
    /// 25 rows
    TwentyFive,
    /// 50 rows
    Fifty,
}

impl PageSize {
    /// Number of rows.
    pub fn get(&self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            10 => Ok(PageSize::Ten),
            25 => Ok(PageSize::TwentyFive),
            50 => Ok(PageSize::Fifty),
            other => Err(Error::validation_field(
                format!("page size must be 10, 25 or 50, got {}", other),
                "page_size",
            )),
        }
    }
}

impl From<PageSize> for usize {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

/// One page of a filtered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// 1-based page number after clamping
    pub page: usize,
    /// Rows per page
    pub page_size: PageSize,
    /// Rows across all pages
    pub total: usize,
    /// Number of pages, at least 1
    pub total_pages: usize,
    /// 1-based index of the first row shown, 0 when empty
    pub first_item: usize,
    /// 1-based index of the last row shown, 0 when empty
    pub last_item: usize,
}

/// Number of pages needed for `total` rows; an empty list still has one page.
pub fn total_pages(total: usize, page_size: PageSize) -> usize {
    total.div_ceil(page_size.get()).max(1)
}

/// Slice out page `page` (1-based, clamped into range) of `items`.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: PageSize) -> Page<T> {
    let total = items.len();
    let total_pages = total_pages(total, page_size);
    let page = page.clamp(1, total_pages);

    let start = ((page - 1) * page_size.get()).min(total);
    let end = (start + page_size.get()).min(total);
    let (first_item, last_item) = if start < end { (start + 1, end) } else { (0, 0) };

    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total,
        total_pages,
        first_item,
        last_item,
    }
}
