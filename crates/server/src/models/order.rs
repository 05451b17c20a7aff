//! Order listing and detail models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderhub_core::{AccountId, AccountStatus, LineItemSummary, ReceiptId, ShopId};

/// One row of the order listing.
///
/// This is both the relational projection and the document shape stored in
/// the search index, so the two listing paths return identical rows.
/// Monetary amounts are converted to the account currency (divided by the
/// exchange rate, two decimals) and rendered as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: ReceiptId,
    pub seller_account_id: AccountId,
    pub nickname: Option<String>,
    pub account_status: AccountStatus,
    pub shop_id: Option<ShopId>,
    pub shop_name: Option<String>,
    /// `<nickname> - <shop_name>` convenience label for the grid.
    pub nickname_shop_name: Option<String>,
    pub buyer_name: Option<String>,
    pub country_iso: Option<String>,
    pub full_design: Option<String>,
    pub is_dead: bool,
    pub is_shipped: bool,
    pub line_items: Option<Vec<LineItemSummary>>,
    pub grandtotal: Option<String>,
    pub subtotal: Option<String>,
    pub total_shipping_cost: Option<String>,
    pub currency_code: Option<String>,
    pub rate: Option<Decimal>,
    pub carrier_name: Option<String>,
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
    pub tracking_status: Option<String>,
    /// Earliest expected ship date over the order's line items.
    pub expected_ship_date: Option<NaiveDate>,
    pub creation_tsz: DateTime<Utc>,
}

/// A page of listing rows plus the total row count for the grid.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub rows: Vec<OrderRow>,
    /// Total number of rows matching the filter (the grid's `lastRow`).
    pub last_row: i64,
}

/// Full order detail: the listing row plus buyer address fields.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub row: OrderRow,
    pub buyer_email: Option<String>,
    pub first_line: Option<String>,
    pub second_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}
