//! Transaction (line item) models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use orderhub_core::{ListingId, ReceiptId, SupplierId, TransactionId};

/// One line item of an order.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub id: TransactionId,
    pub receipt_id: ReceiptId,
    pub listing_id: Option<ListingId>,
    pub title: Option<String>,
    pub quantity: i32,
    pub price: Option<Decimal>,
    pub currency_code: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub supplier_status: Option<String>,
    pub to_supplier_order_id: Option<String>,
    pub from_supplier_order_id: Option<String>,
    pub error_message: Option<String>,
    pub tracking_status: Option<String>,
    pub carrier_name: Option<String>,
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
    pub expected_ship_date: Option<NaiveDate>,
    /// Buyer uploaded a custom design for this line item.
    pub custom_design: bool,
    pub design_position: Option<i32>,
    /// Set when the transaction was repointed during an order merge.
    pub merge_receipt_id: Option<ReceiptId>,
}

impl TransactionRow {
    /// Whether any supplier has picked this line item up.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.supplier_status.as_deref().is_some_and(|s| !s.is_empty())
    }
}
