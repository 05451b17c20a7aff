//! Database operations for orders (receipts).
//!
//! The listing WHERE tree is runtime-shaped, so queries here use
//! `sqlx::QueryBuilder` and the runtime `query`/`query_as` API rather than
//! the compile-time macros.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use orderhub_core::{AccountId, AccountStatus, LineItemSummary, ReceiptId, ShopId, TransactionId};

use super::RepositoryError;
use crate::listing::relational::{FROM_CLAUSE, SELECT_COLUMNS};
use crate::models::{Listing, OrderDetail, OrderRow};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for the listing projection.
#[derive(Debug, sqlx::FromRow)]
struct OrderListingRow {
    id: String,
    seller_account_id: i64,
    nickname: Option<String>,
    account_status: String,
    shop_id: Option<i64>,
    shop_name: Option<String>,
    nickname_shop_name: Option<String>,
    buyer_name: Option<String>,
    country_iso: Option<String>,
    full_design: Option<String>,
    is_dead: bool,
    is_shipped: bool,
    line_items: Option<sqlx::types::Json<Vec<LineItemSummary>>>,
    grandtotal: Option<String>,
    subtotal: Option<String>,
    total_shipping_cost: Option<String>,
    currency_code: Option<String>,
    rate: Option<Decimal>,
    carrier_name: Option<String>,
    tracking_code: Option<String>,
    tracking_url: Option<String>,
    tracking_status: Option<String>,
    expected_ship_date: Option<NaiveDate>,
    creation_tsz: DateTime<Utc>,
}

impl From<OrderListingRow> for OrderRow {
    fn from(row: OrderListingRow) -> Self {
        let account_status = if row.account_status == AccountStatus::Inactive.as_str() {
            AccountStatus::Inactive
        } else {
            AccountStatus::Active
        };
        Self {
            id: ReceiptId::new(row.id),
            seller_account_id: AccountId::new(row.seller_account_id),
            nickname: row.nickname,
            account_status,
            shop_id: row.shop_id.map(ShopId::new),
            shop_name: row.shop_name,
            nickname_shop_name: row.nickname_shop_name,
            buyer_name: row.buyer_name,
            country_iso: row.country_iso,
            full_design: row.full_design,
            is_dead: row.is_dead,
            is_shipped: row.is_shipped,
            line_items: row.line_items.map(|json| json.0),
            grandtotal: row.grandtotal,
            subtotal: row.subtotal,
            total_shipping_cost: row.total_shipping_cost,
            currency_code: row.currency_code,
            rate: row.rate,
            carrier_name: row.carrier_name,
            tracking_code: row.tracking_code,
            tracking_url: row.tracking_url,
            tracking_status: row.tracking_status,
            expected_ship_date: row.expected_ship_date,
            creation_tsz: row.creation_tsz,
        }
    }
}

/// Internal row type for the detail projection (listing row plus address).
#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    #[sqlx(flatten)]
    listing: OrderListingRow,
    buyer_email: Option<String>,
    first_line: Option<String>,
    second_line: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
}

impl From<OrderDetailRow> for OrderDetail {
    fn from(row: OrderDetailRow) -> Self {
        Self {
            row: row.listing.into(),
            buyer_email: row.buyer_email,
            first_line: row.first_line,
            second_line: row.second_line,
            city: row.city,
            state: row.state,
            zip: row.zip,
        }
    }
}

const DETAIL_COLUMNS: &str = ", receipts.buyer_email, receipts.first_line, \
receipts.second_line, receipts.city, receipts.state, receipts.zip";

/// Column list copied into a cloned receipt, fulfillment state excluded.
const CLONE_INSERT: &str = "\
INSERT INTO receipts (id, seller_account_id, was_paid, is_dead, is_shipped, \
full_design, line_items, grandtotal, subtotal, total_shipping_cost, \
currency_code, country_iso, buyer_name, buyer_email, first_line, second_line, \
city, state, zip, creation_tsz, created_at) \
SELECT ";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrdersRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrdersRepository<'a> {
    /// Create a new orders repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Execute a prebuilt listing query and its companion count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    pub async fn execute_listing(
        &self,
        mut select: QueryBuilder<'static, Postgres>,
        mut count: QueryBuilder<'static, Postgres>,
    ) -> Result<Listing, RepositoryError> {
        let rows: Vec<OrderListingRow> = select
            .build_query_as()
            .fetch_all(self.pool)
            .await?;
        let last_row: i64 = count.build_query_scalar().fetch_one(self.pool).await?;
        Ok(Listing {
            rows: rows.into_iter().map(OrderRow::from).collect(),
            last_row,
        })
    }

    /// Load one order's listing row, e.g. for the write mirror.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    pub async fn listing_row(&self, id: &ReceiptId) -> Result<Option<OrderRow>, RepositoryError> {
        let mut qb = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(FROM_CLAUSE);
        qb.push(" AND receipts.id = ");
        qb.push_bind(id.as_str().to_owned());
        let row: Option<OrderListingRow> =
            qb.build_query_as().fetch_optional(self.pool).await?;
        Ok(row.map(OrderRow::from))
    }

    /// Load the full order detail.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the order is absent or
    /// soft-deleted.
    #[instrument(skip(self))]
    pub async fn find_detail(&self, id: &ReceiptId) -> Result<OrderDetail, RepositoryError> {
        let mut qb = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(DETAIL_COLUMNS);
        qb.push(FROM_CLAUSE);
        qb.push(" AND receipts.id = ");
        qb.push_bind(id.as_str().to_owned());
        let row: Option<OrderDetailRow> =
            qb.build_query_as().fetch_optional(self.pool).await?;
        row.map(OrderDetail::from).ok_or(RepositoryError::NotFound)
    }

    /// Whether an order exists and is not soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    pub async fn exists(&self, id: &ReceiptId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM receipts WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Soft-delete orders and their line items atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, ids: &[ReceiptId]) -> Result<u64, RepositoryError> {
        let raw: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(
            "UPDATE receipts SET deleted_at = now() \
             WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(&raw)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        sqlx::query(
            "UPDATE transactions SET deleted_at = now() \
             WHERE receipt_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(&raw)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(deleted)
    }

    /// Find the first unused clone id for an order's root.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    pub async fn next_clone_id(&self, id: &ReceiptId) -> Result<ReceiptId, RepositoryError> {
        let mut n = 1;
        loop {
            let candidate = id.clone_candidate(n);
            let taken: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM receipts WHERE id = $1)")
                    .bind(candidate.as_str())
                    .fetch_one(self.pool)
                    .await?;
            if !taken {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Clone an order with a subset of its line items.
    ///
    /// The clone starts with a clean fulfillment state: not shipped, not
    /// dead, empty line item summary, fresh timestamps. Cloned transactions
    /// get synthesized ids and cleared supplier/tracking fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the source order or any
    /// selected transaction is missing.
    #[instrument(skip(self))]
    pub async fn clone_order(
        &self,
        source: &ReceiptId,
        clone_id: &ReceiptId,
        transaction_ids: &[TransactionId],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut insert = QueryBuilder::new(CLONE_INSERT);
        insert.push_bind(clone_id.as_str().to_owned());
        insert.push(
            ", seller_account_id, was_paid, FALSE, FALSE, full_design, NULL, \
             grandtotal, subtotal, total_shipping_cost, currency_code, \
             country_iso, buyer_name, buyer_email, first_line, second_line, \
             city, state, zip, now(), now() FROM receipts WHERE id = ",
        );
        insert.push_bind(source.as_str().to_owned());
        insert.push(" AND deleted_at IS NULL");
        let inserted = insert.build().execute(&mut *tx).await?.rows_affected();
        if inserted == 0 {
            return Err(RepositoryError::NotFound);
        }

        for old_id in transaction_ids {
            let suffix: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(8)
                .map(char::from)
                .collect::<String>()
                .to_lowercase();
            let new_id = old_id.cloned_with(&suffix);
            let cloned = sqlx::query(
                "INSERT INTO transactions (id, receipt_id, listing_id, title, \
                 quantity, price, currency_code, supplier_id, supplier_status, \
                 to_supplier_order_id, from_supplier_order_id, error_message, \
                 tracking_status, carrier_name, tracking_code, tracking_url, \
                 expected_ship_date, custom_design, design_position, created_at) \
                 SELECT $1, $2, listing_id, title, quantity, price, \
                 currency_code, NULL, NULL, NULL, NULL, NULL, NULL, NULL, \
                 NULL, NULL, expected_ship_date, custom_design, \
                 design_position, now() \
                 FROM transactions WHERE id = $3 AND receipt_id = $4",
            )
            .bind(new_id.as_str())
            .bind(clone_id.as_str())
            .bind(old_id.as_str())
            .bind(source.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if cloned == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Merge orders into one, repointing line items to the survivor.
    ///
    /// Refused when any line item is already with a supplier or the orders
    /// span more than one seller account. The survivor is the first
    /// canonical (numeric) id in caller order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when the merge is refused and
    /// `RepositoryError::NotFound` when any order is missing.
    #[instrument(skip(self))]
    pub async fn merge(&self, ids: &[ReceiptId]) -> Result<ReceiptId, RepositoryError> {
        let ids = dedup_ids(ids);
        let raw: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let mut tx = self.pool.begin().await?;

        let accounts: Vec<i64> = sqlx::query_scalar(
            "SELECT seller_account_id FROM receipts \
             WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(&raw)
        .fetch_all(&mut *tx)
        .await?;
        if accounts.len() != ids.len() {
            return Err(RepositoryError::NotFound);
        }
        let first_account = accounts.first().copied().ok_or(RepositoryError::NotFound)?;
        if accounts.iter().any(|a| *a != first_account) {
            return Err(RepositoryError::Conflict(
                "cannot merge orders across seller accounts".to_string(),
            ));
        }

        let fulfilled: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transactions \
             WHERE receipt_id = ANY($1) AND deleted_at IS NULL \
             AND COALESCE(supplier_status, '') <> '')",
        )
        .bind(&raw)
        .fetch_one(&mut *tx)
        .await?;
        if fulfilled {
            return Err(RepositoryError::Conflict(
                "cannot merge orders with fulfilled line items".to_string(),
            ));
        }

        let survivor = ids
            .iter()
            .find(|id| id.is_canonical())
            .or_else(|| ids.first())
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        let absorbed: Vec<String> = raw
            .iter()
            .filter(|id| *id != survivor.as_str())
            .cloned()
            .collect();

        sqlx::query(
            "UPDATE transactions SET merge_receipt_id = receipt_id, receipt_id = $1 \
             WHERE receipt_id = ANY($2) AND deleted_at IS NULL",
        )
        .bind(survivor.as_str())
        .bind(&absorbed)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE receipts SET deleted_at = now() WHERE id = ANY($1)")
            .bind(&absorbed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(survivor)
    }

    /// Clear fulfillment state on orders and their line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    #[instrument(skip(self))]
    pub async fn reset_fulfillment(&self, ids: &[ReceiptId]) -> Result<(), RepositoryError> {
        let raw: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE transactions SET supplier_status = NULL, \
             to_supplier_order_id = NULL, from_supplier_order_id = NULL, \
             error_message = NULL, tracking_status = NULL, carrier_name = NULL, \
             tracking_code = NULL, tracking_url = NULL \
             WHERE receipt_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(&raw)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE receipts SET line_items = NULL, is_shipped = FALSE \
             WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(&raw)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Set the tracking status on orders' line items and mark them shipped.
    ///
    /// Rebuilds the denormalized `line_items` summary afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    #[instrument(skip(self))]
    pub async fn set_tracking_status(
        &self,
        ids: &[ReceiptId],
        tracking_status: &str,
    ) -> Result<(), RepositoryError> {
        let raw: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE transactions SET tracking_status = $1 \
             WHERE receipt_id = ANY($2) AND deleted_at IS NULL",
        )
        .bind(tracking_status)
        .bind(&raw)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE receipts SET is_shipped = TRUE WHERE id = ANY($1)")
            .bind(&raw)
            .execute(&mut *tx)
            .await?;
        Self::rebuild_line_items(&mut tx, &raw).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Rebuild the denormalized `line_items` summary for a set of orders.
    ///
    /// One entry per distinct supplier state; orders without live
    /// transactions keep a null summary.
    async fn rebuild_line_items(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        raw_ids: &[String],
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE receipts SET line_items = sub.items FROM (\
             SELECT t.receipt_id, jsonb_agg(DISTINCT jsonb_build_object(\
             'supplier_name', s.name, \
             'supplier_status', t.supplier_status, \
             'to_supplier_order_id', t.to_supplier_order_id, \
             'from_supplier_order_id', t.from_supplier_order_id, \
             'error_message', t.error_message, \
             'tracking_status', t.tracking_status, \
             'carrier_name', t.carrier_name, \
             'tracking_code', t.tracking_code, \
             'tracking_url', t.tracking_url)) AS items \
             FROM transactions t \
             LEFT JOIN suppliers s ON s.id = t.supplier_id \
             WHERE t.receipt_id = ANY($1) AND t.deleted_at IS NULL \
             GROUP BY t.receipt_id) sub \
             WHERE receipts.id = sub.receipt_id",
        )
        .bind(raw_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

/// Drop repeated ids while keeping caller order, which decides the merge
/// survivor.
fn dedup_ids(ids: &[ReceiptId]) -> Vec<ReceiptId> {
    let mut unique: Vec<ReceiptId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_merge_ids_collapse_in_caller_order() {
        let ids = vec![
            ReceiptId::new("100_omz1"),
            ReceiptId::new("200"),
            ReceiptId::new("100_omz1"),
            ReceiptId::new("200"),
        ];
        assert_eq!(
            dedup_ids(&ids),
            vec![ReceiptId::new("100_omz1"), ReceiptId::new("200")]
        );
    }

    #[test]
    fn distinct_ids_pass_through_unchanged() {
        let ids = vec![ReceiptId::new("1"), ReceiptId::new("2")];
        assert_eq!(dedup_ids(&ids), ids);
    }
}
