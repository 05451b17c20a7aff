//! Core types for Orderhub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod line_item;
pub mod page;
pub mod status;

pub use id::*;
pub use line_item::LineItemSummary;
pub use page::{PaginationWindow, SortDirection, SortSpec, WindowError};
pub use status::*;
