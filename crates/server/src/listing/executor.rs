//! Listing execution strategies.
//!
//! The path a listing read takes is a deployment decision, not a per-request
//! one: state construction picks either [`RelationalExecutor`] or
//! [`SearchExecutor`] from the configuration and injects it behind the
//! [`ListingExecutor`] trait. Handlers never consult the configuration again.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use orderhub_core::filter::FilterSet;
use orderhub_core::{PaginationWindow, SortSpec};

use super::{relational, search_query, window};
use crate::db::OrdersRepository;
use crate::error::AppError;
use crate::models::{Listing, OrderRow};
use crate::search::SearchClient;

/// Strategy for executing a compiled listing filter.
#[async_trait]
pub trait ListingExecutor: Send + Sync {
    /// Run the listing and its companion count.
    async fn list(
        &self,
        filter: &FilterSet,
        window: PaginationWindow,
        sorts: &[SortSpec],
    ) -> Result<Listing, AppError>;
}

/// Listing over the relational store.
pub struct RelationalExecutor {
    pool: PgPool,
    max_result_window: i64,
}

impl RelationalExecutor {
    /// Create a relational executor.
    #[must_use]
    pub const fn new(pool: PgPool, max_result_window: i64) -> Self {
        Self {
            pool,
            max_result_window,
        }
    }
}

#[async_trait]
impl ListingExecutor for RelationalExecutor {
    #[instrument(skip(self, filter))]
    async fn list(
        &self,
        filter: &FilterSet,
        window: PaginationWindow,
        sorts: &[SortSpec],
    ) -> Result<Listing, AppError> {
        window::check(window, self.max_result_window);
        let select = relational::build_select(filter, window, sorts)?;
        let count = relational::build_count(filter);
        let listing = OrdersRepository::new(&self.pool)
            .execute_listing(select, count)
            .await?;
        Ok(listing)
    }
}

/// Listing over the search index.
pub struct SearchExecutor {
    client: Arc<SearchClient>,
    index: String,
    max_result_window: i64,
}

impl SearchExecutor {
    /// Create a search executor over the given orders index.
    #[must_use]
    pub const fn new(client: Arc<SearchClient>, index: String, max_result_window: i64) -> Self {
        Self {
            client,
            index,
            max_result_window,
        }
    }
}

#[async_trait]
impl ListingExecutor for SearchExecutor {
    #[instrument(skip(self, filter))]
    async fn list(
        &self,
        filter: &FilterSet,
        window: PaginationWindow,
        sorts: &[SortSpec],
    ) -> Result<Listing, AppError> {
        window::check(window, self.max_result_window);
        let body = search_query::build_body(filter, sorts)?;
        let hits = self
            .client
            .search(&self.index, window.offset(), window.size(), &body)
            .await?;

        let mut rows = Vec::with_capacity(hits.documents.len());
        for doc in hits.documents {
            let row: OrderRow = serde_json::from_value(doc)
                .map_err(|e| AppError::Internal(format!("malformed order document: {e}")))?;
            rows.push(row);
        }

        // The per-query total is capped by the index, so the grid total
        // comes from a dedicated count request.
        let count_body = search_query::build_count_body(filter);
        let last_row = self.client.count(&self.index, &count_body).await?;

        Ok(Listing { rows, last_row })
    }
}
