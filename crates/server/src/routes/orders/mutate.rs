//! Order mutation handlers.
//!
//! Every mutation answers from the relational store and queues a mirror
//! push for the affected orders afterwards; the search index catches up
//! eventually.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Days, Utc};
use serde_json::{Value, json};
use tracing::instrument;

use orderhub_core::{ReceiptId, ShopId};

use super::types::{
    CloneOrderRequest, DeleteOrdersRequest, MergeOrdersRequest, ResetOrdersRequest, SyncQuery,
    TrackingStatusRequest,
};
use crate::db::OrdersRepository;
use crate::error::AppError;
use crate::jobs::Job;
use crate::state::AppState;

/// `DELETE /orders` - soft-delete orders and their line items.
#[instrument(skip(state, request))]
pub async fn remove(
    State(state): State<AppState>,
    Json(request): Json<DeleteOrdersRequest>,
) -> Result<Json<Value>, AppError> {
    if request.ids.is_empty() {
        return Err(AppError::Validation("ids must not be empty".to_string()));
    }
    let deleted = OrdersRepository::new(state.pool())
        .soft_delete(&request.ids)
        .await?;
    for id in &request.ids {
        state.jobs().mirror_order(id);
    }
    Ok(Json(json!({ "deleted": deleted })))
}

/// `POST /orders/{id}/clone` - clone an order with selected line items.
#[instrument(skip(state, request))]
pub async fn clone_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CloneOrderRequest>,
) -> Result<Json<Value>, AppError> {
    if request.transaction_ids.is_empty() {
        return Err(AppError::Validation(
            "transaction_ids must not be empty".to_string(),
        ));
    }
    let source = ReceiptId::new(id);
    let repo = OrdersRepository::new(state.pool());
    let clone_id = repo.next_clone_id(&source).await?;
    repo.clone_order(&source, &clone_id, &request.transaction_ids)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => AppError::order_not_found(&source),
            other => other.into(),
        })?;
    state.jobs().mirror_order(&clone_id);
    Ok(Json(json!({ "id": clone_id })))
}

/// `POST /orders/merge` - merge orders into the first canonical one.
#[instrument(skip(state, request))]
pub async fn merge(
    State(state): State<AppState>,
    Json(request): Json<MergeOrdersRequest>,
) -> Result<Json<Value>, AppError> {
    if request.receipt_ids.len() < 2 {
        return Err(AppError::Validation(
            "merging requires at least two receipt_ids".to_string(),
        ));
    }
    let survivor = OrdersRepository::new(state.pool())
        .merge(&request.receipt_ids)
        .await?;
    // The absorbed orders are mirrored too, which removes them from the
    // index once their soft delete lands.
    for id in &request.receipt_ids {
        state.jobs().mirror_order(id);
    }
    Ok(Json(json!({ "id": survivor })))
}

/// `POST /orders/reset` - clear fulfillment state.
#[instrument(skip(state, request))]
pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetOrdersRequest>,
) -> Result<Json<Value>, AppError> {
    if request.receipt_ids.is_empty() {
        return Err(AppError::Validation(
            "receipt_ids must not be empty".to_string(),
        ));
    }
    OrdersRepository::new(state.pool())
        .reset_fulfillment(&request.receipt_ids)
        .await?;
    for id in &request.receipt_ids {
        state.jobs().mirror_order(id);
    }
    Ok(Json(json!({ "reset": request.receipt_ids.len() })))
}

/// `POST /orders/tracking-status` - set tracking state and mark shipped.
#[instrument(skip(state, request))]
pub async fn set_tracking_status(
    State(state): State<AppState>,
    Json(request): Json<TrackingStatusRequest>,
) -> Result<Json<Value>, AppError> {
    if request.receipt_ids.is_empty() {
        return Err(AppError::Validation(
            "receipt_ids must not be empty".to_string(),
        ));
    }
    if request.tracking_status.trim().is_empty() {
        return Err(AppError::Validation(
            "tracking_status must not be empty".to_string(),
        ));
    }
    OrdersRepository::new(state.pool())
        .set_tracking_status(&request.receipt_ids, request.tracking_status.trim())
        .await?;
    for id in &request.receipt_ids {
        state.jobs().mirror_order(id);
    }
    Ok(Json(json!({ "updated": request.receipt_ids.len() })))
}

/// `POST /orders/{id}/sync` - dispatch a marketplace sync for a shop.
///
/// Fire-and-forget: the job is queued and the request answers 202.
#[instrument(skip(state))]
pub async fn sync_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
    Query(query): Query<SyncQuery>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let now = Utc::now();
    let min_created = query.from_date.map_or_else(
        || now - chrono::Duration::days(2),
        |d| d.and_time(chrono::NaiveTime::MIN).and_utc(),
    );
    let max_created = query
        .to_date
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .map_or(now, |d| d.and_time(chrono::NaiveTime::MIN).and_utc());
    if min_created >= max_created {
        return Err(AppError::Validation(
            "fromDate must be before toDate".to_string(),
        ));
    }

    state.jobs().enqueue(Job::SyncShop {
        shop_id: ShopId::new(shop_id),
        min_created,
        max_created,
    });
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
}
