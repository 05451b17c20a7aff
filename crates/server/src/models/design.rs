//! Print design models.

use serde::Serialize;

use orderhub_core::{ListingId, TransactionId};

/// Who owns a set of designs.
///
/// A transaction with a buyer-uploaded custom design owns its designs
/// directly; otherwise the designs hang off the product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum DesignOwner {
    Transaction(TransactionId),
    Listing(ListingId),
}

/// One print design (a printable artwork slot on a product).
#[derive(Debug, Clone, Serialize)]
pub struct Design {
    pub id: i64,
    /// Print position on the product (front, back, ...), zero-based.
    pub position: i32,
    pub preview_url: Option<String>,
    pub print_url: Option<String>,
}
