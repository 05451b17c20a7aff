//! Relational query builder: `FilterSet` to SQL.
//!
//! The WHERE tree is shaped at runtime from the populated filter fields, so
//! queries are assembled with [`sqlx::QueryBuilder`] rather than the
//! compile-time macros. Everything caller-controlled is bound; the only
//! interpolated fragments are sort expressions from the allow-list and the
//! pagination numbers derived from a validated window.

use orderhub_core::filter::{FilterSet, FullDesignFilter, ShipDateBound, SupplierStatusFilter};
use orderhub_core::{AccountStatus, PaginationWindow, SortSpec};
use sqlx::{Postgres, QueryBuilder};

use super::{ListingError, sort_expression};

const DEFAULT_SORT: &str = "receipts.creation_tsz DESC";

pub(crate) const SELECT_COLUMNS: &str = "\
SELECT receipts.id, receipts.seller_account_id, accounts.nickname, \
accounts.status AS account_status, shops.id AS shop_id, shops.shop_name, \
CASE WHEN accounts.nickname IS NULL THEN shops.shop_name \
ELSE accounts.nickname || ' - ' || COALESCE(shops.shop_name, '') END AS nickname_shop_name, \
receipts.buyer_name, receipts.country_iso, receipts.full_design, \
receipts.is_dead, receipts.is_shipped, receipts.line_items, \
round(receipts.grandtotal / COALESCE(currency_rates.rate, 1), 2)::text AS grandtotal, \
round(receipts.subtotal / COALESCE(currency_rates.rate, 1), 2)::text AS subtotal, \
round(receipts.total_shipping_cost / COALESCE(currency_rates.rate, 1), 2)::text AS total_shipping_cost, \
receipts.currency_code, currency_rates.rate, \
receipt_shipments.carrier_name, receipt_shipments.tracking_code, \
receipt_shipments.tracking_url, receipt_shipments.tracking_status, \
(SELECT MIN(t.expected_ship_date) FROM transactions t \
WHERE t.receipt_id = receipts.id AND t.deleted_at IS NULL) AS expected_ship_date, \
receipts.creation_tsz";

pub(crate) const FROM_CLAUSE: &str = " \
FROM receipts \
JOIN accounts ON accounts.id = receipts.seller_account_id \
LEFT JOIN shops ON shops.account_id = accounts.id \
LEFT JOIN receipt_shipments ON receipt_shipments.receipt_id = receipts.id \
LEFT JOIN currency_rates ON currency_rates.currency_code = receipts.currency_code \
WHERE receipts.was_paid = TRUE AND receipts.deleted_at IS NULL";

/// Build the paged SELECT for a compiled filter.
///
/// # Errors
///
/// Returns [`ListingError::UnknownSortColumn`] when a sort key is not on the
/// allow-list.
pub fn build_select(
    filter: &FilterSet,
    window: PaginationWindow,
    sorts: &[SortSpec],
) -> Result<QueryBuilder<'static, Postgres>, ListingError> {
    let mut qb = QueryBuilder::new(SELECT_COLUMNS);
    qb.push(FROM_CLAUSE);
    push_predicates(&mut qb, filter);

    qb.push(" ORDER BY ");
    if sorts.is_empty() {
        qb.push(DEFAULT_SORT);
    } else {
        for (i, sort) in sorts.iter().enumerate() {
            let expr = sort_expression(&sort.column)
                .ok_or_else(|| ListingError::UnknownSortColumn(sort.column.clone()))?;
            if i > 0 {
                qb.push(", ");
            }
            qb.push(expr);
            qb.push(" ");
            qb.push(sort.direction.as_sql());
        }
    }

    // Page translation: the executed offset is the start of the page the
    // caller's offset falls into.
    qb.push(format!(
        " LIMIT {} OFFSET {}",
        window.size(),
        window.page_offset()
    ));
    Ok(qb)
}

/// Build the companion COUNT sharing the identical predicate tree.
#[must_use]
pub fn build_count(filter: &FilterSet) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*)");
    qb.push(FROM_CLAUSE);
    push_predicates(&mut qb, filter);
    qb
}

fn push_predicates(qb: &mut QueryBuilder<'static, Postgres>, filter: &FilterSet) {
    if let Some(prefix) = &filter.id_prefix {
        qb.push(" AND receipts.id LIKE ");
        qb.push_bind(format!("{}%", escape_like(prefix)));
        qb.push(" ESCAPE '\\'");
    }

    match &filter.full_design {
        Some(FullDesignFilter::IsDead) => {
            qb.push(" AND receipts.is_dead = TRUE");
        }
        Some(FullDesignFilter::Value(design)) => {
            qb.push(" AND receipts.full_design = ");
            qb.push_bind(design.clone());
        }
        None => {}
    }

    if filter.require_live {
        qb.push(" AND receipts.is_dead = FALSE AND accounts.status = ");
        qb.push_bind(AccountStatus::Active.as_str());
    }

    if let Some(status) = &filter.tracking_status {
        qb.push(" AND receipts.line_items @> ");
        qb.push_bind(serde_json::json!([{ "tracking_status": status }]));
    }

    match &filter.supplier_status {
        Some(SupplierStatusFilter::Assigned(status)) => {
            qb.push(" AND receipts.line_items @> ");
            qb.push_bind(serde_json::json!([{ "supplier_status": status }]));
        }
        Some(SupplierStatusFilter::Unassigned) => {
            qb.push(
                " AND (receipts.line_items IS NULL \
                 OR jsonb_array_length(receipts.line_items) < 1)",
            );
        }
        None => {}
    }

    if let Some(overdue) = &filter.overdue {
        qb.push(
            " AND receipts.is_shipped = FALSE AND EXISTS (\
             SELECT 1 FROM transactions t \
             WHERE t.receipt_id = receipts.id AND t.deleted_at IS NULL \
             AND t.expected_ship_date ",
        );
        let (op, date) = match overdue.bound {
            ShipDateBound::Before(d) => ("<", d),
            ShipDateBound::On(d) => ("=", d),
            ShipDateBound::OnOrAfter(d) => (">=", d),
        };
        qb.push(op);
        qb.push(" ");
        qb.push_bind(date);
        qb.push(")");
    }

    if let Some(shop_id) = filter.shop_id {
        qb.push(" AND shops.id = ");
        qb.push_bind(shop_id);
    }

    if let Some(range) = &filter.date_range {
        qb.push(" AND receipts.creation_tsz::date >= ");
        qb.push_bind(range.from);
        qb.push(" AND receipts.creation_tsz::date <= ");
        qb.push_bind(range.to);
    }

    if let Some(scope) = &filter.account_scope {
        let ids: Vec<i64> = scope.iter().map(|id| id.as_i64()).collect();
        qb.push(" AND accounts.id = ANY(");
        qb.push_bind(ids);
        qb.push(")");
    }
}

/// Escape LIKE metacharacters so the prefix matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use orderhub_core::filter::{CompileContext, FilterParams};
    use orderhub_core::{ShopId, SortDirection};

    fn compile(params: FilterParams) -> FilterSet {
        FilterSet::compile(
            &params,
            &CompileContext {
                today: NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date"),
                lookback_days: 60,
                account_scope: None,
            },
        )
    }

    fn window() -> PaginationWindow {
        PaginationWindow::new(0, 100).expect("valid window")
    }

    fn sql(filter: &FilterSet, sorts: &[SortSpec]) -> String {
        build_select(filter, window(), sorts)
            .expect("query builds")
            .sql()
            .to_string()
    }

    #[test]
    fn base_query_always_scopes_paid_undeleted() {
        let text = sql(&compile(FilterParams::default()), &[]);
        assert!(text.contains("receipts.was_paid = TRUE"));
        assert!(text.contains("receipts.deleted_at IS NULL"));
        assert!(text.contains("ORDER BY receipts.creation_tsz DESC"));
    }

    #[test]
    fn prefix_filter_uses_escaped_like() {
        let text = sql(
            &compile(FilterParams {
                q: Some("123".to_owned()),
                ..FilterParams::default()
            }),
            &[],
        );
        assert!(text.contains("receipts.id LIKE "));
        assert!(text.contains("ESCAPE"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("10%_a\\b"), "10\\%\\_a\\\\b");
    }

    #[test]
    fn tracking_filter_emits_containment_and_live_pair() {
        let text = sql(
            &compile(FilterParams {
                tracking_status: Some("in_transit".to_owned()),
                ..FilterParams::default()
            }),
            &[],
        );
        assert!(text.contains("receipts.line_items @> "));
        assert!(text.contains("receipts.is_dead = FALSE"));
        assert!(text.contains("accounts.status = "));
    }

    #[test]
    fn unassigned_checks_empty_line_items() {
        let text = sql(
            &compile(FilterParams {
                supplier_status: Some("new_order".to_owned()),
                ..FilterParams::default()
            }),
            &[],
        );
        assert!(text.contains("jsonb_array_length(receipts.line_items) < 1"));
    }

    #[test]
    fn overdue_emits_exists_subquery() {
        let text = sql(
            &compile(FilterParams {
                overdue_day: Some(-1),
                ..FilterParams::default()
            }),
            &[],
        );
        assert!(text.contains("receipts.is_shipped = FALSE"));
        assert!(text.contains("EXISTS ("));
        assert!(text.contains("t.expected_ship_date <"));
    }

    #[test]
    fn shop_and_date_range_are_bound() {
        let text = sql(
            &compile(FilterParams {
                shop_id: Some(ShopId::new(42)),
                ..FilterParams::default()
            }),
            &[],
        );
        assert!(text.contains("shops.id = "));
        assert!(text.contains("receipts.creation_tsz::date >= "));
        assert!(text.contains("receipts.creation_tsz::date <= "));
    }

    #[test]
    fn pagination_translates_offset_to_page_start() {
        let filter = compile(FilterParams::default());
        let w = PaginationWindow::new(200, 50).expect("valid window");
        let text = build_select(&filter, w, &[])
            .expect("query builds")
            .sql()
            .to_string();
        assert!(text.ends_with("LIMIT 50 OFFSET 200"));

        let ragged = PaginationWindow::new(130, 50).expect("valid window");
        let text = build_select(&filter, ragged, &[])
            .expect("query builds")
            .sql()
            .to_string();
        assert!(text.ends_with("LIMIT 50 OFFSET 100"));
    }

    #[test]
    fn sort_allow_list_rejects_unknown_columns() {
        let filter = compile(FilterParams::default());
        let sorts = vec![SortSpec::new("buyer_name; DROP TABLE", SortDirection::Asc)];
        assert_eq!(
            build_select(&filter, window(), &sorts).err(),
            Some(ListingError::UnknownSortColumn(
                "buyer_name; DROP TABLE".to_owned()
            ))
        );
    }

    #[test]
    fn sorts_apply_in_caller_order() {
        let filter = compile(FilterParams::default());
        let sorts = vec![
            SortSpec::new("grandtotal", SortDirection::Desc),
            SortSpec::new("id", SortDirection::Asc),
        ];
        let text = build_select(&filter, window(), &sorts)
            .expect("query builds")
            .sql()
            .to_string();
        assert!(text.contains("ORDER BY receipts.grandtotal DESC, receipts.id ASC"));
    }

    #[test]
    fn count_shares_the_predicate_tree() {
        let filter = compile(FilterParams {
            q: Some("55".to_owned()),
            overdue_day: Some(3),
            ..FilterParams::default()
        });
        let count = build_count(&filter).sql().to_string();
        assert!(count.starts_with("SELECT COUNT(*)"));
        assert!(count.contains("receipts.id LIKE "));
        assert!(count.contains("EXISTS ("));
        assert!(!count.contains("ORDER BY"));
        assert!(!count.contains("LIMIT"));
    }
}
