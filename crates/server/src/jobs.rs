//! In-process background jobs.
//!
//! Write mirroring and shop syncs are fire-and-forget: handlers enqueue a
//! job and answer immediately. The worker drains an unbounded channel; its
//! failures are logged (and reach Sentry through tracing), never surfaced
//! to the request that queued the job. The mirror is therefore eventually
//! consistent with the relational store, with no freshness bound.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::mpsc;

use orderhub_core::{ReceiptId, ShopId};

use crate::db::OrdersRepository;
use crate::search::SearchClient;

/// A queued background job.
#[derive(Debug)]
pub enum Job {
    /// Re-index one order's listing row into the search mirror.
    MirrorOrder(ReceiptId),
    /// Pull new orders for a shop from the marketplace.
    SyncShop {
        shop_id: ShopId,
        min_created: DateTime<Utc>,
        max_created: DateTime<Utc>,
    },
}

/// Collaborator that performs the actual marketplace sync.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    /// Pull orders created within the window for one shop.
    async fn sync_shop(
        &self,
        shop_id: ShopId,
        min_created: DateTime<Utc>,
        max_created: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default handler: records the dispatch and does nothing else.
///
/// The real sync runs in a separate ingestion service; this keeps the
/// endpoint contract intact in deployments without it.
pub struct LoggingSyncHandler;

#[async_trait]
impl SyncHandler for LoggingSyncHandler {
    async fn sync_shop(
        &self,
        shop_id: ShopId,
        min_created: DateTime<Utc>,
        max_created: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(%shop_id, %min_created, %max_created, "shop sync dispatched");
        Ok(())
    }
}

/// Handle for enqueueing jobs.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    /// Enqueue a job. Failures are logged, not returned: the queue only
    /// closes during shutdown, and queued work is best-effort by contract.
    pub fn enqueue(&self, job: Job) {
        if let Err(e) = self.tx.send(job) {
            tracing::warn!(error = %e, "job queue closed, dropping job");
        }
    }

    /// Mirror an order into the search index, if the mirror is enabled.
    pub fn mirror_order(&self, id: &ReceiptId) {
        self.enqueue(Job::MirrorOrder(id.clone()));
    }
}

/// Start the worker task and return the queue handle.
///
/// `search` is `None` when the search mirror is disabled; mirror jobs are
/// then dropped silently.
pub fn start(
    pool: PgPool,
    search: Option<(Arc<SearchClient>, String)>,
    sync_handler: Arc<dyn SyncHandler>,
) -> JobQueue {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            run_job(&pool, search.as_ref(), sync_handler.as_ref(), job).await;
        }
        tracing::info!("job worker stopped");
    });
    JobQueue { tx }
}

async fn run_job(
    pool: &PgPool,
    search: Option<&(Arc<SearchClient>, String)>,
    sync_handler: &dyn SyncHandler,
    job: Job,
) {
    match job {
        Job::MirrorOrder(id) => {
            let Some((client, index)) = search else {
                return;
            };
            if let Err(e) = mirror_order(pool, client, index, &id).await {
                tracing::error!(order_id = %id, error = %e, "order mirror push failed");
            }
        }
        Job::SyncShop {
            shop_id,
            min_created,
            max_created,
        } => {
            if let Err(e) = sync_handler.sync_shop(shop_id, min_created, max_created).await {
                tracing::error!(%shop_id, error = %e, "shop sync failed");
            }
        }
    }
}

/// Load the order's current listing row and upsert it into the index.
///
/// A soft-deleted order is removed from the mirror instead.
async fn mirror_order(
    pool: &PgPool,
    client: &SearchClient,
    index: &str,
    id: &ReceiptId,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let repo = OrdersRepository::new(pool);
    match repo.listing_row(id).await? {
        Some(row) => {
            let document = serde_json::to_value(&row)?;
            client.index_document(index, id.as_str(), &document).await?;
        }
        None => {
            client.delete_document(index, id.as_str()).await?;
        }
    }
    Ok(())
}
