//! Database operations for the Orderhub `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `receipts` - Orders, soft-deleted via `deleted_at`, with a denormalized
//!   `line_items` JSONB summary (one entry per distinct supplier)
//! - `accounts` - Seller accounts
//! - `shops` - Marketplace shops, one or more per account
//! - `suppliers` - Print/fulfillment suppliers
//! - `transactions` - Order line items, soft-deleted via `deleted_at`
//! - `receipt_shipments` - Latest shipment per order
//! - `currency_rates` - Currency conversion rates for listing amounts
//! - `designs` - Print designs keyed by owner (transaction or listing)
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via
//! `sqlx migrate run`.

pub mod designs;
pub mod orders;
pub mod transactions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use designs::DesignsRepository;
pub use orders::OrdersRepository;
pub use transactions::TransactionsRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The operation conflicts with the current state of the data.
    #[error("{0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
