//! Bounded-window pagination and sorting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from constructing a pagination window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("offset must be >= 0 (got {0})")]
    NegativeOffset(i64),
    #[error("page size must be > 0 (got {0})")]
    EmptyPage(i64),
}

/// An offset/size window over a result set.
///
/// Both the relational and search listing paths page with the same window.
/// The search index additionally imposes a maximum `offset + size` ceiling;
/// see the result window guard in the server crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationWindow {
    offset: i64,
    size: i64,
}

impl PaginationWindow {
    /// Create a window, enforcing `offset >= 0` and `size > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError`] when either bound is violated.
    pub const fn new(offset: i64, size: i64) -> Result<Self, WindowError> {
        if offset < 0 {
            return Err(WindowError::NegativeOffset(offset));
        }
        if size < 1 {
            return Err(WindowError::EmptyPage(size));
        }
        Ok(Self { offset, size })
    }

    /// Start of the window.
    #[must_use]
    pub const fn offset(self) -> i64 {
        self.offset
    }

    /// Number of rows requested.
    #[must_use]
    pub const fn size(self) -> i64 {
        self.size
    }

    /// Exclusive end of the window (`offset + size`).
    #[must_use]
    pub const fn end(self) -> i64 {
        self.offset + self.size
    }

    /// One-based page number for page-oriented stores.
    ///
    /// Stable paging requires the caller to keep `offset` a multiple of
    /// `size` across requests; a ragged offset is truncated to its page.
    #[must_use]
    pub const fn page(self) -> i64 {
        self.offset / self.size + 1
    }

    /// Offset the page translation actually lands on: `(page - 1) * size`.
    #[must_use]
    pub const fn page_offset(self) -> i64 {
        (self.page() - 1) * self.size
    }
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self {
            offset: 0,
            size: 100,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Search-index order keyword.
    #[must_use]
    pub const fn as_search(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One caller-supplied sort instruction, applied in the order given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column key as the grid names it (e.g. `creation_tsz`, `grandtotal`).
    #[serde(rename = "colId")]
    pub column: String,
    /// Direction for this column.
    #[serde(rename = "sort")]
    pub direction: SortDirection,
}

impl SortSpec {
    /// Convenience constructor.
    #[must_use]
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_bounds() {
        assert_eq!(
            PaginationWindow::new(-1, 10),
            Err(WindowError::NegativeOffset(-1))
        );
        assert_eq!(PaginationWindow::new(0, 0), Err(WindowError::EmptyPage(0)));
    }

    #[test]
    fn page_translation() {
        // offset=200, size=50 must map to page 5
        let window = PaginationWindow::new(200, 50).expect("valid window");
        assert_eq!(window.page(), 5);
        assert_eq!(window.page_offset(), 200);
    }

    #[test]
    fn ragged_offset_truncates_to_page() {
        let window = PaginationWindow::new(130, 50).expect("valid window");
        assert_eq!(window.page(), 3);
        assert_eq!(window.page_offset(), 100);
    }

    #[test]
    fn window_end() {
        let window = PaginationWindow::new(49_950, 100).expect("valid window");
        assert_eq!(window.end(), 50_050);
    }
}
