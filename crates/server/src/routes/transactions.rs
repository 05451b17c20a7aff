//! Transaction (line item) endpoints.

use axum::{
    Json,
    extract::{Path, State},
    routing::{get, post},
};
use axum::Router;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use orderhub_core::{ReceiptId, TransactionId};

use crate::db::{DesignsRepository, OrdersRepository, RepositoryError, TransactionsRepository};
use crate::error::AppError;
use crate::models::TransactionRow;
use crate::state::AppState;

/// Transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}/transactions", get(list_for_order))
        .route("/transactions/{id}/detach", post(detach))
        .route("/transactions/{id}/quantity", post(set_quantity))
        .route("/transactions/{id}/designs", get(designs))
}

/// `GET /orders/{id}/transactions` - an order's line items.
#[instrument(skip(state))]
pub async fn list_for_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TransactionRow>>, AppError> {
    let id = ReceiptId::new(id);
    if !OrdersRepository::new(state.pool()).exists(&id).await? {
        return Err(AppError::order_not_found(&id));
    }
    let rows = TransactionsRepository::new(state.pool())
        .list_for_order(&id)
        .await?;
    Ok(Json(rows))
}

/// `POST /transactions/{id}/detach` - split a multi-quantity line item
/// into unit siblings.
#[instrument(skip(state))]
pub async fn detach(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = TransactionId::new(id);
    let repo = TransactionsRepository::new(state.pool());
    let row = repo.find(&id).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::transaction_not_found(&id),
        other => other.into(),
    })?;

    let siblings = repo.detach(&id).await.map_err(|e| match e {
        RepositoryError::Conflict(msg) => AppError::BadRequest(msg),
        RepositoryError::NotFound => AppError::transaction_not_found(&id),
        other => other.into(),
    })?;

    state.jobs().mirror_order(&row.receipt_id);
    Ok(Json(json!({ "id": id, "siblings": siblings })))
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

/// `POST /transactions/{id}/quantity` - update a line item quantity.
#[instrument(skip(state, request))]
pub async fn set_quantity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<Value>, AppError> {
    if request.quantity < 1 {
        return Err(AppError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    let id = TransactionId::new(id);
    let repo = TransactionsRepository::new(state.pool());
    repo.set_quantity(&id, request.quantity)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::transaction_not_found(&id),
            other => other.into(),
        })?;

    let row = repo.find(&id).await?;
    state.jobs().mirror_order(&row.receipt_id);
    Ok(Json(json!({ "id": id, "quantity": request.quantity })))
}

/// `GET /transactions/{id}/designs` - the designs of a line item's owner.
///
/// Customized line items own their designs; everything else resolves to
/// the product listing's designs.
#[instrument(skip(state))]
pub async fn designs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = TransactionId::new(id);
    let owner = TransactionsRepository::new(state.pool())
        .design_owner(&id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::transaction_not_found(&id),
            other => other.into(),
        })?;
    let designs = DesignsRepository::new(state.pool())
        .list_for_owner(&owner)
        .await?;
    Ok(Json(json!({ "owner": owner, "designs": designs })))
}
