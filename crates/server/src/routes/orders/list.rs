//! Order listing and detail handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use chrono::Utc;
use tracing::instrument;

use orderhub_core::filter::{CompileContext, FilterParams, FilterSet};
use orderhub_core::{AccountId, PaginationWindow, ReceiptId, ShopId};

use super::types::{ListingQuery, ListingResponse};
use crate::config::ServerConfig;
use crate::db::OrdersRepository;
use crate::error::AppError;
use crate::models::OrderDetail;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 100;

/// Header carrying the caller's visible seller accounts.
///
/// Stand-in for a real authorization layer: upstream infrastructure
/// resolves the caller and injects the scope.
const ACCOUNT_SCOPE_HEADER: &str = "x-account-scope";

/// `GET /orders` - the listing.
#[instrument(skip(state, headers))]
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ListingResponse>, AppError> {
    let window = PaginationWindow::new(
        query.offset.unwrap_or(0),
        query.size.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;
    let sorts = query.sorts()?;

    let params = FilterParams {
        q: query.q,
        full_design: query.full_design,
        tracking_status: query.tracking_status,
        supplier_status: query.supplier_status,
        overdue_day: query.overdue_day,
        shop_id: query.shop_id.map(ShopId::new),
        from_date: query.from_date,
        to_date: query.to_date,
    };
    let ctx = CompileContext {
        today: Utc::now().date_naive(),
        lookback_days: state.config().lookback_days,
        account_scope: account_scope(state.config(), &headers)?,
    };
    let filter = FilterSet::compile(&params, &ctx);

    let listing = state.executor().list(&filter, window, &sorts).await?;
    Ok(Json(ListingResponse {
        rows: listing.rows,
        last_row: listing.last_row,
        filter,
    }))
}

/// `GET /orders/{id}` - full order detail.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, AppError> {
    let id = ReceiptId::new(id);
    let detail = OrdersRepository::new(state.pool())
        .find_detail(&id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => AppError::order_not_found(&id),
            other => other.into(),
        })?;
    Ok(Json(detail))
}

/// Resolve the caller's account scope from config and header.
fn account_scope(
    config: &ServerConfig,
    headers: &HeaderMap,
) -> Result<Option<Vec<AccountId>>, AppError> {
    if config.account_scope_unrestricted {
        return Ok(None);
    }
    let Some(raw) = headers.get(ACCOUNT_SCOPE_HEADER) else {
        return Ok(None);
    };
    let raw = raw
        .to_str()
        .map_err(|_| AppError::BadRequest("invalid account scope header".to_string()))?;
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(AccountId::new)
                .map_err(|_| AppError::BadRequest(format!("invalid account id '{s}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if ids.is_empty() { None } else { Some(ids) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(unrestricted: bool) -> ServerConfig {
        ServerConfig {
            database_url: secrecy::SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().expect("valid addr"),
            port: 3000,
            search: None,
            max_result_window: 50_000,
            lookback_days: 60,
            account_scope_unrestricted: unrestricted,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    #[test]
    fn scope_header_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCOUNT_SCOPE_HEADER, "3, 17".parse().expect("value"));
        let scope = account_scope(&config(false), &headers).expect("parses");
        assert_eq!(scope, Some(vec![AccountId::new(3), AccountId::new(17)]));
    }

    #[test]
    fn unrestricted_config_ignores_the_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCOUNT_SCOPE_HEADER, "3".parse().expect("value"));
        let scope = account_scope(&config(true), &headers).expect("parses");
        assert_eq!(scope, None);
    }

    #[test]
    fn garbage_scope_is_a_bad_request() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCOUNT_SCOPE_HEADER, "3,abc".parse().expect("value"));
        assert!(matches!(
            account_scope(&config(false), &headers),
            Err(AppError::BadRequest(_))
        ));
    }
}
