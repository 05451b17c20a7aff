//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::jobs::{self, JobQueue, LoggingSyncHandler, SyncHandler};
use crate::listing::{ListingExecutor, RelationalExecutor, SearchExecutor};
use crate::search::SearchClient;

/// Application state shared across request handlers.
///
/// The listing path is decided here, once: when the search configuration is
/// present, reads go through the index and writes are mirrored to it;
/// otherwise everything stays relational.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    pool: PgPool,
    executor: Arc<dyn ListingExecutor>,
    jobs: JobQueue,
}

impl AppState {
    /// Build the application state, provisioning the search index when the
    /// search path is enabled.
    ///
    /// # Errors
    ///
    /// Returns `AppError` when the search client cannot be built or the
    /// orders index cannot be provisioned.
    pub async fn new(config: ServerConfig, pool: PgPool) -> Result<Self, AppError> {
        let sync_handler: Arc<dyn SyncHandler> = Arc::new(LoggingSyncHandler);
        Self::with_sync_handler(config, pool, sync_handler).await
    }

    /// Build the state with a custom marketplace sync collaborator.
    ///
    /// # Errors
    ///
    /// Returns `AppError` when the search client cannot be built or the
    /// orders index cannot be provisioned.
    pub async fn with_sync_handler(
        config: ServerConfig,
        pool: PgPool,
        sync_handler: Arc<dyn SyncHandler>,
    ) -> Result<Self, AppError> {
        let search = match config.search() {
            Some(search_config) => {
                let client = Arc::new(SearchClient::new(search_config).map_err(|e| {
                    AppError::Internal(format!("failed to build search client: {e}"))
                })?);
                client.ensure_orders_index(&search_config.orders_index).await?;
                Some((client, search_config.orders_index.clone()))
            }
            None => None,
        };

        let executor: Arc<dyn ListingExecutor> = match &search {
            Some((client, index)) => {
                tracing::info!(index, "listing reads routed through the search index");
                Arc::new(SearchExecutor::new(
                    Arc::clone(client),
                    index.clone(),
                    config.max_result_window,
                ))
            }
            None => Arc::new(RelationalExecutor::new(
                pool.clone(),
                config.max_result_window,
            )),
        };

        let jobs = jobs::start(pool.clone(), search, sync_handler);

        Ok(Self {
            config: Arc::new(config),
            pool,
            executor,
            jobs,
        })
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The database pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The injected listing strategy.
    #[must_use]
    pub fn executor(&self) -> &dyn ListingExecutor {
        self.executor.as_ref()
    }

    /// The background job queue.
    #[must_use]
    pub const fn jobs(&self) -> &JobQueue {
        &self.jobs
    }
}
