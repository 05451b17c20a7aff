//! Search query builder: `FilterSet` to an index query body.
//!
//! The index speaks the Elasticsearch REST dialect. Every populated filter
//! field contributes one clause to a `bool.must` conjunction; offset and
//! size are passed to the client as native `from`/`size` parameters rather
//! than embedded in the body.

use orderhub_core::filter::{FilterSet, FullDesignFilter, ShipDateBound, SupplierStatusFilter};
use orderhub_core::{SortDirection, SortSpec};
use serde_json::{Value, json};

use super::{ListingError, sort_expression};

/// Build the search body for a compiled filter, including sort.
///
/// # Errors
///
/// Returns [`ListingError::UnknownSortColumn`] when a sort key is not on the
/// allow-list. The relational and search paths accept exactly the same keys;
/// the index sorts on the document field of the same name.
pub fn build_body(filter: &FilterSet, sorts: &[SortSpec]) -> Result<Value, ListingError> {
    let mut body = build_count_body(filter);

    let sort: Vec<Value> = if sorts.is_empty() {
        vec![json!({ "creation_tsz": { "order": SortDirection::Desc.as_search() } })]
    } else {
        sorts
            .iter()
            .map(|s| {
                sort_expression(&s.column)
                    .ok_or_else(|| ListingError::UnknownSortColumn(s.column.clone()))?;
                let mut clause = serde_json::Map::new();
                clause.insert(
                    s.column.clone(),
                    json!({ "order": s.direction.as_search() }),
                );
                Ok(Value::Object(clause))
            })
            .collect::<Result<_, ListingError>>()?
    };
    body["sort"] = Value::Array(sort);
    Ok(body)
}

/// Build the body for the companion count request: the query alone, no sort.
#[must_use]
pub fn build_count_body(filter: &FilterSet) -> Value {
    let mut must: Vec<Value> = Vec::new();

    if let Some(prefix) = &filter.id_prefix {
        must.push(json!({ "wildcard": { "id": format!("{prefix}*") } }));
    }

    match &filter.full_design {
        Some(FullDesignFilter::IsDead) => {
            must.push(json!({ "match": { "is_dead": true } }));
        }
        Some(FullDesignFilter::Value(design)) => {
            must.push(json!({ "match": { "full_design": design } }));
        }
        None => {}
    }

    if filter.require_live {
        must.push(json!({ "match": { "is_dead": false } }));
        must.push(json!({ "match": { "account_status": "active" } }));
    }

    if let Some(status) = &filter.tracking_status {
        must.push(json!({ "match": { "line_items": status } }));
    }

    match &filter.supplier_status {
        Some(SupplierStatusFilter::Assigned(status)) => {
            must.push(json!({ "match": { "line_items": status } }));
        }
        Some(SupplierStatusFilter::Unassigned) => {
            must.push(json!({
                "bool": { "must_not": [ { "exists": { "field": "line_items" } } ] }
            }));
        }
        None => {}
    }

    if let Some(overdue) = &filter.overdue {
        must.push(json!({ "match": { "is_shipped": false } }));
        let range = match overdue.bound {
            ShipDateBound::Before(d) => json!({ "lt": d }),
            ShipDateBound::On(d) => json!({ "gte": d, "lte": d }),
            ShipDateBound::OnOrAfter(d) => json!({ "gte": d }),
        };
        must.push(json!({ "range": { "expected_ship_date": range } }));
    }

    if let Some(shop_id) = filter.shop_id {
        must.push(json!({ "term": { "shop_id": shop_id.as_i64() } }));
    }

    if let Some(range) = &filter.date_range {
        must.push(json!({
            "range": { "creation_tsz": { "gte": range.from, "lte": range.to } }
        }));
    }

    if let Some(scope) = &filter.account_scope {
        let ids: Vec<i64> = scope.iter().map(|id| id.as_i64()).collect();
        must.push(json!({ "terms": { "seller_account_id": ids } }));
    }

    json!({ "query": { "bool": { "must": must } } })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use orderhub_core::filter::{CompileContext, FilterParams, OrderDocument};
    use orderhub_core::{AccountId, AccountStatus, LineItemSummary, ShopId};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn compile(params: FilterParams) -> FilterSet {
        FilterSet::compile(
            &params,
            &CompileContext {
                today: today(),
                lookback_days: 60,
                account_scope: None,
            },
        )
    }

    fn must_clauses(filter: &FilterSet) -> Vec<Value> {
        build_count_body(filter)["query"]["bool"]["must"]
            .as_array()
            .unwrap()
            .clone()
    }

    #[test]
    fn prefix_becomes_a_wildcard_clause() {
        let clauses = must_clauses(&compile(FilterParams {
            q: Some("123".to_owned()),
            ..FilterParams::default()
        }));
        assert!(clauses.contains(&json!({ "wildcard": { "id": "123*" } })));
    }

    #[test]
    fn live_pair_and_tracking_match() {
        let clauses = must_clauses(&compile(FilterParams {
            tracking_status: Some("in_transit".to_owned()),
            ..FilterParams::default()
        }));
        assert!(clauses.contains(&json!({ "match": { "is_dead": false } })));
        assert!(clauses.contains(&json!({ "match": { "account_status": "active" } })));
        assert!(clauses.contains(&json!({ "match": { "line_items": "in_transit" } })));
    }

    #[test]
    fn unassigned_is_a_must_not_exists() {
        let clauses = must_clauses(&compile(FilterParams {
            supplier_status: Some("new_order".to_owned()),
            ..FilterParams::default()
        }));
        assert!(clauses.contains(&json!({
            "bool": { "must_not": [ { "exists": { "field": "line_items" } } ] }
        })));
    }

    #[test]
    fn default_sort_is_newest_first() {
        let body = build_body(&compile(FilterParams::default()), &[]).unwrap();
        assert_eq!(
            body["sort"],
            json!([{ "creation_tsz": { "order": "desc" } }])
        );
    }

    #[test]
    fn count_body_has_no_sort() {
        let body = build_count_body(&compile(FilterParams::default()));
        assert!(body.get("sort").is_none());
        assert!(body.get("from").is_none());
        assert!(body.get("size").is_none());
    }

    #[test]
    fn sort_keys_share_the_relational_allow_list() {
        let filter = compile(FilterParams::default());
        let bad = vec![SortSpec::new("script_field", SortDirection::Asc)];
        assert_eq!(
            build_body(&filter, &bad).err(),
            Some(ListingError::UnknownSortColumn("script_field".to_owned()))
        );
    }

    // =========================================================================
    // Cross-path equivalence
    //
    // Interpret the emitted clauses over in-memory documents and compare the
    // accepted set with the reference evaluator. The interpreter only covers
    // the clause shapes this builder emits.
    // =========================================================================

    fn eval_clause(clause: &Value, doc: &OrderDocument) -> bool {
        if let Some(wildcard) = clause.get("wildcard") {
            let pattern = wildcard["id"].as_str().unwrap();
            let prefix = pattern.strip_suffix('*').unwrap();
            return doc.id.starts_with(prefix);
        }
        if let Some(m) = clause.get("match") {
            let (field, expected) = m.as_object().unwrap().iter().next().unwrap();
            return match field.as_str() {
                "is_dead" => doc.is_dead == expected.as_bool().unwrap(),
                "is_shipped" => doc.is_shipped == expected.as_bool().unwrap(),
                "account_status" => doc.account_status.as_str() == expected.as_str().unwrap(),
                "full_design" => doc.full_design.as_deref() == expected.as_str(),
                "line_items" => {
                    let needle = expected.as_str().unwrap();
                    doc.line_items.iter().any(|li| {
                        li.has_tracking_status(needle) || li.has_supplier_status(needle)
                    })
                }
                other => panic!("unexpected match field {other}"),
            };
        }
        if let Some(inner) = clause.get("bool") {
            let must_not = inner["must_not"].as_array().unwrap();
            assert_eq!(must_not, &[json!({ "exists": { "field": "line_items" } })]);
            return doc.line_items.is_empty();
        }
        if let Some(term) = clause.get("term") {
            return doc.shop_id.map(|s| s.as_i64()) == term["shop_id"].as_i64();
        }
        if let Some(terms) = clause.get("terms") {
            let ids = terms["seller_account_id"].as_array().unwrap();
            return ids.iter().any(|v| v.as_i64() == Some(doc.account_id.as_i64()));
        }
        if let Some(range) = clause.get("range") {
            let (field, bounds) = range.as_object().unwrap().iter().next().unwrap();
            let parse = |key: &str| {
                bounds
                    .get(key)
                    .map(|v| v.as_str().unwrap().parse::<NaiveDate>().unwrap())
            };
            let (gte, lte, lt) = (parse("gte"), parse("lte"), parse("lt"));
            let check = |d: NaiveDate| {
                gte.is_none_or(|b| d >= b) && lte.is_none_or(|b| d <= b) && lt.is_none_or(|b| d < b)
            };
            return match field.as_str() {
                "creation_tsz" => check(doc.creation_date),
                "expected_ship_date" => doc.expected_ship_dates.iter().any(|d| check(*d)),
                other => panic!("unexpected range field {other}"),
            };
        }
        panic!("unexpected clause {clause}");
    }

    fn search_accepts(filter: &FilterSet, doc: &OrderDocument) -> bool {
        // The index only holds paid, undeleted orders.
        doc.was_paid
            && !doc.deleted
            && must_clauses(filter).iter().all(|c| eval_clause(c, doc))
    }

    fn fixture_docs() -> Vec<OrderDocument> {
        let base = OrderDocument {
            account_id: AccountId::new(1),
            account_status: AccountStatus::Active,
            was_paid: true,
            creation_date: today(),
            ..OrderDocument::default()
        };
        let li = |supplier: Option<&str>, tracking: Option<&str>| LineItemSummary {
            supplier_status: supplier.map(str::to_owned),
            tracking_status: tracking.map(str::to_owned),
            ..LineItemSummary::default()
        };
        vec![
            OrderDocument {
                id: "123".to_owned(),
                ..base.clone()
            },
            OrderDocument {
                id: "1234".to_owned(),
                line_items: vec![li(Some("submitted"), None)],
                ..base.clone()
            },
            OrderDocument {
                id: "2001".to_owned(),
                is_dead: true,
                line_items: vec![li(Some("submitted"), Some("shipped"))],
                ..base.clone()
            },
            OrderDocument {
                id: "2002".to_owned(),
                line_items: vec![li(Some("in_production"), Some("in_transit"))],
                expected_ship_dates: vec![today() - chrono::Days::new(3)],
                ..base.clone()
            },
            OrderDocument {
                id: "2003".to_owned(),
                account_id: AccountId::new(7),
                account_status: AccountStatus::Inactive,
                shop_id: Some(ShopId::new(9)),
                full_design: Some("finished".to_owned()),
                ..base.clone()
            },
            OrderDocument {
                id: "2004".to_owned(),
                is_shipped: true,
                line_items: vec![li(Some("submitted"), Some("shipped"))],
                expected_ship_dates: vec![today() - chrono::Days::new(10)],
                ..base
            },
        ]
    }

    #[test]
    fn search_clauses_agree_with_the_reference_evaluator() {
        let filter_grid = vec![
            FilterParams::default(),
            FilterParams {
                q: Some("123".to_owned()),
                ..FilterParams::default()
            },
            FilterParams {
                full_design: Some("isDead".to_owned()),
                ..FilterParams::default()
            },
            FilterParams {
                full_design: Some("finished".to_owned()),
                ..FilterParams::default()
            },
            FilterParams {
                tracking_status: Some("shipped".to_owned()),
                ..FilterParams::default()
            },
            FilterParams {
                tracking_status: Some("pending".to_owned()),
                ..FilterParams::default()
            },
            FilterParams {
                supplier_status: Some("new_order".to_owned()),
                ..FilterParams::default()
            },
            FilterParams {
                supplier_status: Some("in_production".to_owned()),
                ..FilterParams::default()
            },
            FilterParams {
                overdue_day: Some(-1),
                ..FilterParams::default()
            },
            FilterParams {
                shop_id: Some(ShopId::new(9)),
                ..FilterParams::default()
            },
        ];

        let docs = fixture_docs();
        for params in filter_grid {
            let filter = compile(params.clone());
            for doc in &docs {
                assert_eq!(
                    filter.matches(doc),
                    search_accepts(&filter, doc),
                    "paths disagree for params {params:?} on doc {}",
                    doc.id
                );
            }
        }
    }
}
