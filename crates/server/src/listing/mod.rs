//! The dual-path order listing.
//!
//! A compiled [`orderhub_core::filter::FilterSet`] can be executed two ways:
//! translated to SQL over the relational store ([`relational`]) or to a
//! search-index query body ([`search_query`]). The path is chosen once at
//! startup and injected as a [`ListingExecutor`]; both paths return the same
//! [`crate::models::Listing`] shape and share the result window guard.

pub mod executor;
pub mod relational;
pub mod search_query;
pub mod window;

pub use executor::{ListingExecutor, RelationalExecutor, SearchExecutor};

use thiserror::Error;

/// Grid sort keys and the SQL expression each maps to.
///
/// Sort columns are interpolated into SQL, so only keys on this list are
/// accepted; anything else is rejected before the query is built. The search
/// path sorts on the document field of the same name.
pub(crate) const SORTABLE_COLUMNS: &[(&str, &str)] = &[
    ("id", "receipts.id"),
    ("creation_tsz", "receipts.creation_tsz"),
    ("grandtotal", "receipts.grandtotal"),
    ("subtotal", "receipts.subtotal"),
    ("total_shipping_cost", "receipts.total_shipping_cost"),
    ("nickname", "accounts.nickname"),
    ("shop_name", "shops.shop_name"),
    ("full_design", "receipts.full_design"),
    ("country_iso", "receipts.country_iso"),
    ("buyer_name", "receipts.buyer_name"),
    ("tracking_status", "receipt_shipments.tracking_status"),
    ("expected_ship_date", "expected_ship_date"),
];

/// Look up the SQL expression for a grid sort key.
pub(crate) fn sort_expression(column: &str) -> Option<&'static str> {
    SORTABLE_COLUMNS
        .iter()
        .find(|(key, _)| *key == column)
        .map(|(_, expr)| *expr)
}

/// Errors from building a listing query.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// Sort key is not on the allow-list.
    #[error("cannot sort by '{0}'")]
    UnknownSortColumn(String),
}

impl From<ListingError> for crate::error::AppError {
    fn from(err: ListingError) -> Self {
        Self::Validation(err.to_string())
    }
}
