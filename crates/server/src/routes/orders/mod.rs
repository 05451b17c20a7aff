//! Order endpoints.

pub mod list;
pub mod mutate;
pub mod types;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list::index).delete(mutate::remove))
        .route("/orders/merge", post(mutate::merge))
        .route("/orders/reset", post(mutate::reset))
        .route("/orders/tracking-status", post(mutate::set_tracking_status))
        .route("/orders/{id}", get(list::detail))
        .route("/orders/{id}/clone", post(mutate::clone_order))
        .route("/orders/{id}/sync", post(mutate::sync_shop))
}
