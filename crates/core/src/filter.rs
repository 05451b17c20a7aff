//! The abstract listing filter and its compiler.
//!
//! Request parameters arrive as loosely-typed strings; the compiler turns
//! them into an immutable [`FilterSet`] that both the relational and the
//! search-index query builders consume. Compilation is pure: the request-time
//! `today` and the configured defaults come in through [`CompileContext`],
//! so the same parameters always yield the same set.
//!
//! [`FilterSet::matches`] is the reference evaluator. It defines what each
//! constraint means against an in-memory order and is what the query builders
//! are tested against.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::types::{AccountId, AccountStatus, LineItemSummary, ShopId};

/// Tracking statuses that are routing hints rather than literal line item
/// matches. `pending` redirects to the supplier-status rule and `is_overdue`
/// is expressed through the `overdue_day` parameter instead.
const PASS_THROUGH_TRACKING: [&str; 2] = ["pending", "is_overdue"];

/// Sentinel in the `full_design` parameter that selects dead orders instead
/// of filtering on the design column.
const FULL_DESIGN_DEAD: &str = "isDead";

/// Supplier status written when a pending tracking filter forces one.
const SUPPLIER_STATUS_SUBMITTED: &str = "submitted";

/// Supplier status sentinel meaning "no supplier assigned yet".
const SUPPLIER_STATUS_NEW: &str = "new_order";

/// Raw listing parameters, already url-decoded by the HTTP layer.
///
/// Every field is optional; an absent field compiles to no constraint.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    /// Free-text search box; only ID-prefix search is supported.
    pub q: Option<String>,
    /// Design filter, or the `isDead` sentinel.
    pub full_design: Option<String>,
    /// Line item tracking status, or a pass-through routing value.
    pub tracking_status: Option<String>,
    /// Line item supplier status, or the `new_order` sentinel.
    pub supplier_status: Option<String>,
    /// Overdue bucket selector (sign and magnitude both matter).
    pub overdue_day: Option<i32>,
    /// Restrict to one shop.
    pub shop_id: Option<ShopId>,
    /// Creation-date range start; defaults from the lookback window.
    pub from_date: Option<NaiveDate>,
    /// Creation-date range end; defaults to today.
    pub to_date: Option<NaiveDate>,
}

/// Request-time inputs the compiler needs besides the parameters.
#[derive(Debug, Clone)]
pub struct CompileContext {
    /// The date the request is evaluated on.
    pub today: NaiveDate,
    /// Default creation-date range width when the caller sends none.
    pub lookback_days: u64,
    /// Seller accounts the caller may see. `None` means unrestricted.
    pub account_scope: Option<Vec<AccountId>>,
}

/// Design-column filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FullDesignFilter {
    /// The `isDead` sentinel: select dead orders, ignore the design column.
    IsDead,
    /// Literal equality on the design column.
    Value(String),
}

/// Supplier-status filter over the denormalized line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SupplierStatusFilter {
    /// At least one line item carries this status.
    Assigned(String),
    /// No line items recorded at all (the `new_order` sentinel).
    Unassigned,
}

/// Pre-resolved bound on `expected_ship_date`.
///
/// The raw `overdue_day` parameter is turned into an absolute date bound at
/// compile time so both builders emit the same comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "date")]
pub enum ShipDateBound {
    Before(NaiveDate),
    On(NaiveDate),
    OnOrAfter(NaiveDate),
}

/// Overdue constraint: not yet shipped, with a ship-date bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverdueFilter {
    /// The caller's bucket selector, kept for the response echo.
    pub raw_days: i32,
    /// The resolved bound.
    pub bound: ShipDateBound,
}

impl OverdueFilter {
    /// Resolve the raw bucket selector against `today`.
    ///
    /// Negative buckets mean "already late" (shipped-by date has passed).
    /// Buckets below five select the single day `today + (n - 1)`; five and
    /// above open an unbounded tail starting there.
    #[must_use]
    pub fn resolve(raw_days: i32, today: NaiveDate) -> Self {
        let bound = if raw_days < 0 {
            ShipDateBound::Before(today)
        } else {
            let target = shift_days(today, i64::from(raw_days) - 1);
            if raw_days < 5 {
                ShipDateBound::On(target)
            } else {
                ShipDateBound::OnOrAfter(target)
            }
        };
        Self { raw_days, bound }
    }
}

/// Inclusive creation-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// The compiled, immutable filter.
///
/// All populated constraints are conjunctive. Serialized as the `filter`
/// echo of the listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct FilterSet {
    /// Order IDs must start with this string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_prefix: Option<String>,
    /// Design filter or the dead-order sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_design: Option<FullDesignFilter>,
    /// Literal line item tracking-status match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_status: Option<String>,
    /// Line item supplier-status match or the unassigned test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_status: Option<SupplierStatusFilter>,
    /// Order not dead and its seller account active.
    pub require_live: bool,
    /// Not shipped yet, with a ship-date bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue: Option<OverdueFilter>,
    /// Restrict to one shop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<ShopId>,
    /// Creation-date window, always populated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    /// Seller accounts visible to the caller; `None` is unrestricted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_scope: Option<Vec<AccountId>>,
}

impl FilterSet {
    /// Compile raw parameters into a filter set.
    ///
    /// Rule order matters: the pending tracking status both skips the
    /// literal tracking match and forces the supplier status, so rules 3
    /// and 4 must see the original value.
    #[must_use]
    pub fn compile(params: &FilterParams, ctx: &CompileContext) -> Self {
        let mut set = Self {
            date_range: Some(default_date_range(params, ctx)),
            account_scope: ctx.account_scope.clone(),
            shop_id: params.shop_id,
            ..Self::default()
        };

        if let Some(q) = non_empty(params.q.as_deref()) {
            set.id_prefix = Some(q.to_owned());
        }

        if let Some(design) = non_empty(params.full_design.as_deref()) {
            set.full_design = Some(if design == FULL_DESIGN_DEAD {
                FullDesignFilter::IsDead
            } else {
                FullDesignFilter::Value(design.to_owned())
            });
        }

        let tracking = non_empty(params.tracking_status.as_deref());
        let tracking_is_pending = tracking == Some("pending");

        if let Some(status) = tracking
            && !PASS_THROUGH_TRACKING.contains(&status)
        {
            set.require_live = true;
            set.tracking_status = Some(status.to_owned());
        }

        let supplier = non_empty(params.supplier_status.as_deref());
        if supplier.is_some() || tracking_is_pending {
            set.require_live = true;
            // A pending tracking filter means "handed to a supplier, not
            // yet moving", which the data model records as submitted.
            let effective = if tracking_is_pending {
                SUPPLIER_STATUS_SUBMITTED
            } else {
                supplier.unwrap_or_default()
            };
            set.supplier_status = Some(if effective == SUPPLIER_STATUS_NEW {
                SupplierStatusFilter::Unassigned
            } else {
                SupplierStatusFilter::Assigned(effective.to_owned())
            });
        }

        if let Some(days) = params.overdue_day {
            set.require_live = true;
            set.overdue = Some(OverdueFilter::resolve(days, ctx.today));
        }

        set
    }

    /// Reference evaluator: does `doc` satisfy every populated constraint?
    #[must_use]
    pub fn matches(&self, doc: &OrderDocument) -> bool {
        if !doc.was_paid || doc.deleted {
            return false;
        }
        if let Some(prefix) = &self.id_prefix
            && !doc.id.starts_with(prefix.as_str())
        {
            return false;
        }
        match &self.full_design {
            Some(FullDesignFilter::IsDead) if !doc.is_dead => return false,
            Some(FullDesignFilter::Value(v)) if doc.full_design.as_deref() != Some(v) => {
                return false;
            }
            _ => {}
        }
        if self.require_live && (doc.is_dead || doc.account_status != AccountStatus::Active) {
            return false;
        }
        if let Some(status) = &self.tracking_status
            && !doc.line_items.iter().any(|li| li.has_tracking_status(status))
        {
            return false;
        }
        match &self.supplier_status {
            Some(SupplierStatusFilter::Assigned(status))
                if !doc.line_items.iter().any(|li| li.has_supplier_status(status)) =>
            {
                return false;
            }
            Some(SupplierStatusFilter::Unassigned) if !doc.line_items.is_empty() => {
                return false;
            }
            _ => {}
        }
        if let Some(overdue) = &self.overdue {
            if doc.is_shipped {
                return false;
            }
            let within = doc.expected_ship_dates.iter().any(|d| match overdue.bound {
                ShipDateBound::Before(b) => *d < b,
                ShipDateBound::On(b) => *d == b,
                ShipDateBound::OnOrAfter(b) => *d >= b,
            });
            if !within {
                return false;
            }
        }
        if let Some(shop) = self.shop_id
            && doc.shop_id != Some(shop)
        {
            return false;
        }
        if let Some(range) = &self.date_range
            && (doc.creation_date < range.from || doc.creation_date > range.to)
        {
            return false;
        }
        if let Some(scope) = &self.account_scope
            && !scope.contains(&doc.account_id)
        {
            return false;
        }
        true
    }
}

/// In-memory order shape the reference evaluator runs against.
///
/// Mirrors the fields the two builders can see: the denormalized listing row
/// on the relational side and the indexed document on the search side.
#[derive(Debug, Clone)]
pub struct OrderDocument {
    pub id: String,
    pub account_id: AccountId,
    pub account_status: AccountStatus,
    pub shop_id: Option<ShopId>,
    pub was_paid: bool,
    pub deleted: bool,
    pub is_dead: bool,
    pub is_shipped: bool,
    pub full_design: Option<String>,
    pub line_items: Vec<LineItemSummary>,
    pub expected_ship_dates: Vec<NaiveDate>,
    pub creation_date: NaiveDate,
}

impl Default for OrderDocument {
    fn default() -> Self {
        Self {
            id: String::new(),
            account_id: AccountId::new(0),
            account_status: AccountStatus::Active,
            shop_id: None,
            was_paid: false,
            deleted: false,
            is_dead: false,
            is_shipped: false,
            full_design: None,
            line_items: Vec::new(),
            expected_ship_dates: Vec::new(),
            creation_date: NaiveDate::MIN,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn default_date_range(params: &FilterParams, ctx: &CompileContext) -> DateRange {
    let to = params.to_date.unwrap_or(ctx.today);
    let from = params
        .from_date
        .unwrap_or_else(|| shift_days(ctx.today, -i64::try_from(ctx.lookback_days).unwrap_or(60)));
    DateRange { from, to }
}

/// Date arithmetic that saturates at the calendar edges instead of panicking.
fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn ctx() -> CompileContext {
        CompileContext {
            today: today(),
            lookback_days: 60,
            account_scope: None,
        }
    }

    fn compile(params: FilterParams) -> FilterSet {
        FilterSet::compile(&params, &ctx())
    }

    fn doc(id: &str) -> OrderDocument {
        OrderDocument {
            id: id.to_owned(),
            account_id: AccountId::new(1),
            account_status: AccountStatus::Active,
            was_paid: true,
            creation_date: today(),
            ..OrderDocument::default()
        }
    }

    fn line_item(supplier: Option<&str>, tracking: Option<&str>) -> LineItemSummary {
        LineItemSummary {
            supplier_status: supplier.map(str::to_owned),
            tracking_status: tracking.map(str::to_owned),
            ..LineItemSummary::default()
        }
    }

    #[test]
    fn is_dead_sentinel_excludes_design_match() {
        let set = compile(FilterParams {
            full_design: Some("isDead".to_owned()),
            ..FilterParams::default()
        });
        assert_eq!(set.full_design, Some(FullDesignFilter::IsDead));

        let set = compile(FilterParams {
            full_design: Some("finished".to_owned()),
            ..FilterParams::default()
        });
        assert_eq!(
            set.full_design,
            Some(FullDesignFilter::Value("finished".to_owned()))
        );
    }

    #[test]
    fn pending_tracking_forces_submitted_supplier_status() {
        let set = compile(FilterParams {
            tracking_status: Some("pending".to_owned()),
            supplier_status: Some("in_production".to_owned()),
            ..FilterParams::default()
        });
        // The pending hint overrides whatever supplier_status was sent and
        // never becomes a literal tracking match.
        assert_eq!(set.tracking_status, None);
        assert_eq!(
            set.supplier_status,
            Some(SupplierStatusFilter::Assigned("submitted".to_owned()))
        );
        assert!(set.require_live);
    }

    #[test]
    fn is_overdue_tracking_is_a_pure_routing_value() {
        let set = compile(FilterParams {
            tracking_status: Some("is_overdue".to_owned()),
            ..FilterParams::default()
        });
        assert_eq!(set.tracking_status, None);
        assert_eq!(set.supplier_status, None);
        assert!(!set.require_live);
    }

    #[test]
    fn new_order_maps_to_unassigned() {
        let set = compile(FilterParams {
            supplier_status: Some("new_order".to_owned()),
            ..FilterParams::default()
        });
        assert_eq!(set.supplier_status, Some(SupplierStatusFilter::Unassigned));
        assert!(set.require_live);
    }

    #[test]
    fn literal_tracking_status_requires_live() {
        let set = compile(FilterParams {
            tracking_status: Some("in_transit".to_owned()),
            ..FilterParams::default()
        });
        assert_eq!(set.tracking_status.as_deref(), Some("in_transit"));
        assert!(set.require_live);
    }

    #[test]
    fn overdue_bound_table() {
        let t = today();
        assert_eq!(
            OverdueFilter::resolve(-1, t).bound,
            ShipDateBound::Before(t)
        );
        assert_eq!(
            OverdueFilter::resolve(0, t).bound,
            ShipDateBound::On(t.pred_opt().unwrap())
        );
        assert_eq!(
            OverdueFilter::resolve(1, t).bound,
            ShipDateBound::On(t)
        );
        assert_eq!(
            OverdueFilter::resolve(4, t).bound,
            ShipDateBound::On(t + Days::new(3))
        );
        assert_eq!(
            OverdueFilter::resolve(5, t).bound,
            ShipDateBound::OnOrAfter(t + Days::new(4))
        );
        assert_eq!(
            OverdueFilter::resolve(9, t).bound,
            ShipDateBound::OnOrAfter(t + Days::new(8))
        );
    }

    #[test]
    fn default_date_range_uses_lookback() {
        let set = compile(FilterParams::default());
        assert_eq!(
            set.date_range,
            Some(DateRange {
                from: today() - Days::new(60),
                to: today(),
            })
        );
    }

    #[test]
    fn explicit_dates_win_over_defaults() {
        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let set = compile(FilterParams {
            from_date: Some(from),
            to_date: Some(to),
            ..FilterParams::default()
        });
        assert_eq!(set.date_range, Some(DateRange { from, to }));
    }

    #[test]
    fn blank_parameters_compile_to_no_constraint() {
        let set = compile(FilterParams {
            q: Some("   ".to_owned()),
            full_design: Some(String::new()),
            ..FilterParams::default()
        });
        assert_eq!(set.id_prefix, None);
        assert_eq!(set.full_design, None);
    }

    #[test]
    fn prefix_scenario() {
        let set = compile(FilterParams {
            q: Some("123".to_owned()),
            ..FilterParams::default()
        });
        let accepted: Vec<&str> = ["123", "1234", "9999"]
            .into_iter()
            .filter(|id| set.matches(&doc(id)))
            .collect();
        assert_eq!(accepted, vec!["123", "1234"]);
    }

    #[test]
    fn dead_order_excluded_from_tracking_filter() {
        let set = compile(FilterParams {
            tracking_status: Some("shipped".to_owned()),
            ..FilterParams::default()
        });
        let mut order = doc("555");
        order.line_items = vec![line_item(Some("submitted"), Some("shipped"))];
        assert!(set.matches(&order));

        // Even with matching line items, a dead order never passes a
        // fulfillment-state filter.
        order.is_dead = true;
        assert!(!set.matches(&order));
    }

    #[test]
    fn inactive_account_fails_live_requirement() {
        let set = compile(FilterParams {
            supplier_status: Some("submitted".to_owned()),
            ..FilterParams::default()
        });
        let mut order = doc("555");
        order.line_items = vec![line_item(Some("submitted"), None)];
        assert!(set.matches(&order));

        order.account_status = AccountStatus::Inactive;
        assert!(!set.matches(&order));
    }

    #[test]
    fn unassigned_matches_only_empty_line_items() {
        let set = compile(FilterParams {
            supplier_status: Some("new_order".to_owned()),
            ..FilterParams::default()
        });
        let bare = doc("1");
        assert!(set.matches(&bare));

        let mut assigned = doc("2");
        assigned.line_items = vec![line_item(Some("submitted"), None)];
        assert!(!set.matches(&assigned));
    }

    #[test]
    fn overdue_excludes_shipped_orders() {
        let set = compile(FilterParams {
            overdue_day: Some(-1),
            ..FilterParams::default()
        });
        let mut order = doc("7");
        order.expected_ship_dates = vec![today() - Days::new(2)];
        assert!(set.matches(&order));

        order.is_shipped = true;
        assert!(!set.matches(&order));
    }

    #[test]
    fn account_scope_restricts_visibility() {
        let mut context = ctx();
        context.account_scope = Some(vec![AccountId::new(1), AccountId::new(2)]);
        let set = FilterSet::compile(&FilterParams::default(), &context);

        assert!(set.matches(&doc("1")));
        let mut foreign = doc("2");
        foreign.account_id = AccountId::new(3);
        assert!(!set.matches(&foreign));
    }

    #[test]
    fn unpaid_and_deleted_never_match() {
        let set = compile(FilterParams::default());
        let mut order = doc("1");
        order.was_paid = false;
        assert!(!set.matches(&order));

        let mut order = doc("2");
        order.deleted = true;
        assert!(!set.matches(&order));
    }
}
