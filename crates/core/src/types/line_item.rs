//! Denormalized line item summary.

use serde::{Deserialize, Serialize};

/// One entry of an order's denormalized `line_items` array.
///
/// Each order mirrors the latest fulfillment state of its line items as one
/// summary entry per distinct supplier. The array is rebuilt whenever
/// tracking or supplier state changes and is what both the relational
/// listing filters and the search index match against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineItemSummary {
    pub supplier_name: Option<String>,
    pub supplier_status: Option<String>,
    pub to_supplier_order_id: Option<String>,
    pub from_supplier_order_id: Option<String>,
    pub error_message: Option<String>,
    pub tracking_status: Option<String>,
    pub carrier_name: Option<String>,
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
}

impl LineItemSummary {
    /// Whether any field matches the given supplier status.
    #[must_use]
    pub fn has_supplier_status(&self, status: &str) -> bool {
        self.supplier_status.as_deref() == Some(status)
    }

    /// Whether any field matches the given tracking status.
    #[must_use]
    pub fn has_tracking_status(&self, status: &str) -> bool {
        self.tracking_status.as_deref() == Some(status)
    }
}
