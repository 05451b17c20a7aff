//! Database operations for transactions (order line items).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use orderhub_core::{ListingId, ReceiptId, SupplierId, TransactionId};

use super::RepositoryError;
use crate::models::{DesignOwner, TransactionRow};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TransactionDbRow {
    id: String,
    receipt_id: String,
    listing_id: Option<i64>,
    title: Option<String>,
    quantity: i32,
    price: Option<Decimal>,
    currency_code: Option<String>,
    supplier_id: Option<i64>,
    supplier_name: Option<String>,
    supplier_status: Option<String>,
    to_supplier_order_id: Option<String>,
    from_supplier_order_id: Option<String>,
    error_message: Option<String>,
    tracking_status: Option<String>,
    carrier_name: Option<String>,
    tracking_code: Option<String>,
    tracking_url: Option<String>,
    expected_ship_date: Option<NaiveDate>,
    custom_design: bool,
    design_position: Option<i32>,
    merge_receipt_id: Option<String>,
}

impl From<TransactionDbRow> for TransactionRow {
    fn from(row: TransactionDbRow) -> Self {
        Self {
            id: TransactionId::new(row.id),
            receipt_id: ReceiptId::new(row.receipt_id),
            listing_id: row.listing_id.map(ListingId::new),
            title: row.title,
            quantity: row.quantity,
            price: row.price,
            currency_code: row.currency_code,
            supplier_id: row.supplier_id.map(SupplierId::new),
            supplier_name: row.supplier_name,
            supplier_status: row.supplier_status,
            to_supplier_order_id: row.to_supplier_order_id,
            from_supplier_order_id: row.from_supplier_order_id,
            error_message: row.error_message,
            tracking_status: row.tracking_status,
            carrier_name: row.carrier_name,
            tracking_code: row.tracking_code,
            tracking_url: row.tracking_url,
            expected_ship_date: row.expected_ship_date,
            custom_design: row.custom_design,
            design_position: row.design_position,
            merge_receipt_id: row.merge_receipt_id.map(ReceiptId::new),
        }
    }
}

const SELECT_TRANSACTION: &str = "\
SELECT t.id, t.receipt_id, t.listing_id, t.title, t.quantity, t.price, \
t.currency_code, t.supplier_id, s.name AS supplier_name, t.supplier_status, \
t.to_supplier_order_id, t.from_supplier_order_id, t.error_message, \
t.tracking_status, t.carrier_name, t.tracking_code, t.tracking_url, \
t.expected_ship_date, t.custom_design, t.design_position, t.merge_receipt_id \
FROM transactions t \
LEFT JOIN suppliers s ON s.id = t.supplier_id";

// =============================================================================
// Repository
// =============================================================================

/// Repository for transaction database operations.
pub struct TransactionsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TransactionsRepository<'a> {
    /// Create a new transactions repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the live line items of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    #[instrument(skip(self))]
    pub async fn list_for_order(
        &self,
        receipt_id: &ReceiptId,
    ) -> Result<Vec<TransactionRow>, RepositoryError> {
        let rows: Vec<TransactionDbRow> = sqlx::query_as(&format!(
            "{SELECT_TRANSACTION} WHERE t.receipt_id = $1 AND t.deleted_at IS NULL \
             ORDER BY t.id"
        ))
        .bind(receipt_id.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(TransactionRow::from).collect())
    }

    /// Load one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when absent or soft-deleted.
    pub async fn find(&self, id: &TransactionId) -> Result<TransactionRow, RepositoryError> {
        let row: Option<TransactionDbRow> = sqlx::query_as(&format!(
            "{SELECT_TRANSACTION} WHERE t.id = $1 AND t.deleted_at IS NULL"
        ))
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;
        row.map(TransactionRow::from).ok_or(RepositoryError::NotFound)
    }

    /// Split a multi-quantity transaction into unit siblings.
    ///
    /// The original keeps quantity 1; `quantity - 1` copies are inserted
    /// with ids `<id>_<i>`, all in one database transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when the quantity is not above
    /// one and `RepositoryError::NotFound` when the transaction is missing.
    #[instrument(skip(self))]
    pub async fn detach(&self, id: &TransactionId) -> Result<Vec<TransactionId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM transactions \
             WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let quantity = quantity.ok_or(RepositoryError::NotFound)?;
        if quantity <= 1 {
            return Err(RepositoryError::Conflict(
                "cannot detach a single-quantity transaction".to_string(),
            ));
        }

        sqlx::query("UPDATE transactions SET quantity = 1 WHERE id = $1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        let mut siblings = Vec::new();
        for i in 1..u32::try_from(quantity).unwrap_or(1) {
            let sibling = id.sibling(i);
            sqlx::query(
                "INSERT INTO transactions (id, receipt_id, listing_id, title, \
                 quantity, price, currency_code, supplier_id, supplier_status, \
                 to_supplier_order_id, from_supplier_order_id, error_message, \
                 tracking_status, carrier_name, tracking_code, tracking_url, \
                 expected_ship_date, custom_design, design_position, created_at) \
                 SELECT $1, receipt_id, listing_id, title, 1, price, \
                 currency_code, supplier_id, supplier_status, \
                 to_supplier_order_id, from_supplier_order_id, error_message, \
                 tracking_status, carrier_name, tracking_code, tracking_url, \
                 expected_ship_date, custom_design, design_position, now() \
                 FROM transactions WHERE id = $2",
            )
            .bind(sibling.as_str())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
            siblings.push(sibling);
        }

        tx.commit().await?;
        Ok(siblings)
    }

    /// Update a transaction's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when absent or soft-deleted.
    pub async fn set_quantity(
        &self,
        id: &TransactionId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            "UPDATE transactions SET quantity = $1 \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(quantity)
        .bind(id.as_str())
        .execute(self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Resolve which entity owns a transaction's designs.
    ///
    /// A buyer-customized transaction owns its designs directly; otherwise
    /// they belong to the product listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the transaction is missing
    /// and `RepositoryError::DataCorruption` when it has neither a custom
    /// design nor a listing.
    pub async fn design_owner(&self, id: &TransactionId) -> Result<DesignOwner, RepositoryError> {
        let row: Option<(bool, Option<i64>)> = sqlx::query_as(
            "SELECT custom_design, listing_id FROM transactions \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;
        match row.ok_or(RepositoryError::NotFound)? {
            (true, _) => Ok(DesignOwner::Transaction(id.clone())),
            (false, Some(listing_id)) => Ok(DesignOwner::Listing(ListingId::new(listing_id))),
            (false, None) => Err(RepositoryError::DataCorruption(format!(
                "transaction {id} has neither a custom design nor a listing"
            ))),
        }
    }
}
