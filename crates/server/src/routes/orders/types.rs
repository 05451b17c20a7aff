//! Request and response types for the order endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use orderhub_core::filter::FilterSet;
use orderhub_core::{ReceiptId, SortSpec, TransactionId};

use crate::error::AppError;
use crate::models::OrderRow;

/// Listing query string, flat as the grid sends it.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    /// Free-text search box (order-id prefix).
    pub q: Option<String>,
    pub full_design: Option<String>,
    pub tracking_status: Option<String>,
    pub supplier_status: Option<String>,
    pub overdue_day: Option<i32>,
    pub shop_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub offset: Option<i64>,
    pub size: Option<i64>,
    /// JSON-encoded sort model: `[{"colId":"...","sort":"asc|desc"}]`.
    pub sort: Option<String>,
}

impl ListingQuery {
    /// Decode the grid's JSON sort model.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the model is not valid JSON.
    pub fn sorts(&self) -> Result<Vec<SortSpec>, AppError> {
        match self.sort.as_deref().map(str::trim) {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| AppError::Validation(format!("invalid sort model: {e}"))),
        }
    }
}

/// Listing response: one grid page, the total, and the filter echo.
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub rows: Vec<OrderRow>,
    #[serde(rename = "lastRow")]
    pub last_row: i64,
    pub filter: FilterSet,
}

#[derive(Debug, Deserialize)]
pub struct DeleteOrdersRequest {
    pub ids: Vec<ReceiptId>,
}

#[derive(Debug, Deserialize)]
pub struct CloneOrderRequest {
    pub transaction_ids: Vec<TransactionId>,
}

#[derive(Debug, Deserialize)]
pub struct MergeOrdersRequest {
    pub receipt_ids: Vec<ReceiptId>,
}

#[derive(Debug, Deserialize)]
pub struct ResetOrdersRequest {
    pub receipt_ids: Vec<ReceiptId>,
}

#[derive(Debug, Deserialize)]
pub struct TrackingStatusRequest {
    pub receipt_ids: Vec<ReceiptId>,
    pub tracking_status: String,
}

/// Sync window; defaults to the last two days.
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    #[serde(rename = "fromDate")]
    pub from_date: Option<NaiveDate>,
    #[serde(rename = "toDate")]
    pub to_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderhub_core::SortDirection;

    #[test]
    fn sort_model_round_trips_grid_keys() {
        let query = ListingQuery {
            sort: Some(r#"[{"colId":"grandtotal","sort":"desc"}]"#.to_owned()),
            ..ListingQuery::default()
        };
        let sorts = query.sorts().expect("valid sort model");
        assert_eq!(
            sorts,
            vec![SortSpec::new("grandtotal", SortDirection::Desc)]
        );
    }

    #[test]
    fn empty_sort_model_means_default_sort() {
        let query = ListingQuery::default();
        assert!(query.sorts().expect("valid").is_empty());
    }

    #[test]
    fn malformed_sort_model_is_a_validation_error() {
        let query = ListingQuery {
            sort: Some("not-json".to_owned()),
            ..ListingQuery::default()
        };
        assert!(matches!(query.sorts(), Err(AppError::Validation(_))));
    }
}
