//! HTTP route handlers.

pub mod orders;
pub mod transactions;

use axum::Router;

use crate::state::AppState;

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(orders::routes())
        .merge(transactions::routes())
}
