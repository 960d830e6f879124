//! Orchestration: one call, one computation over immutable snapshots.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::{DiagnosticSink, EngineEvent, EventCategory, EventOutcome};
use crate::classify::{self, CategoryMap, MacroCategory};
use crate::domain::{CauseCode, ClientInfo, OrderItem, PriceList, Sku, StockItem};
use crate::errors::EngineError;
use crate::policy::{self, CategoryOverrides, DiscountTable, ItemException, MarkupSource};
use crate::pricing::{self, PricingParams};
use crate::rows::{self, PricingRow, RowContext, RowOverride, RowTrace, UpsellRow, ValidationResult};
use crate::selection::{self, Acceptance, CandidateReason};

/// Upper bound on suggestions per quote.
pub const MAX_ROWS: usize = 3;

/// Immutable catalog snapshot for one computation. The engine never mutates
/// it and holds no state across calls.
#[derive(Clone, Copy)]
pub struct EngineSnapshot<'a> {
    pub client: &'a ClientInfo,
    pub stock: &'a BTreeMap<Sku, StockItem>,
    pub current_order: &'a [OrderItem],
    pub historical_orders: &'a [OrderItem],
}

/// Read-only policy configuration for one computation.
#[derive(Clone, Copy)]
pub struct PolicySet<'a> {
    pub discount_table: &'a DiscountTable,
    pub overrides: Option<&'a CategoryOverrides>,
    pub exceptions: &'a [ItemException],
    pub category_map: &'a CategoryMap,
}

/// Complete result of one selection+pricing call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellOutcome {
    pub rows: Vec<UpsellRow>,
    pub pricing_rows: Vec<PricingRow>,
    pub trace: Vec<RowTrace>,
    pub validation: ValidationResult,
    pub warnings: Vec<String>,
}

/// Run the selector waterfall and assemble up to [`MAX_ROWS`] priced rows.
///
/// Unknown categories and missing policy defaults abort the whole call with
/// no partial rows; an unresolvable unit cost degrades to a warning and the
/// candidate is skipped.
pub fn compute_upsell(
    snapshot: &EngineSnapshot<'_>,
    policies: &PolicySet<'_>,
    params: &PricingParams,
    cause: CauseCode,
    row_overrides: &BTreeMap<Sku, RowOverride>,
    sink: &dyn DiagnosticSink,
) -> Result<UpsellOutcome, EngineError> {
    let price_list = snapshot.client.price_list;
    let mut upsell_rows: Vec<UpsellRow> = Vec::new();
    let mut pricing_rows: Vec<PricingRow> = Vec::new();
    let mut trace: Vec<RowTrace> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut seen: BTreeSet<Sku> = BTreeSet::new();

    selection::run_waterfall(
        snapshot.current_order,
        snapshot.historical_orders,
        snapshot.stock,
        |item, reason| {
            if upsell_rows.len() >= MAX_ROWS {
                return Ok(Acceptance::CapReached);
            }
            if seen.contains(&item.sku) {
                return Ok(Acceptance::Skipped);
            }
            let Some(stock_item) = snapshot.stock.get(&item.sku) else {
                emit_skip(sink, item, reason, "sku_not_in_stock");
                return Ok(Acceptance::Skipped);
            };
            let availability = stock_item.availability(cause);
            if !availability.is_available() {
                emit_skip(sink, item, reason, "unavailable_for_cause");
                return Ok(Acceptance::Skipped);
            }

            let macro_category = classify_or_abort(&item.category, policies, sink)?;
            let markups = policy::resolve_markups(
                &macro_category,
                price_list,
                policies.discount_table,
                policies.overrides,
                policies.exceptions,
                Some(&item.sku),
            )?;

            let Some(unit_cost) = rows::resolve_unit_cost(stock_item, item) else {
                warnings.push(format!("base unit cost unavailable for {}, row skipped", item.sku));
                emit_skip(sink, item, reason, "missing_unit_cost");
                return Ok(Acceptance::Skipped);
            };

            let ctx = RowContext {
                order_item: item,
                stock_item,
                reason,
                macro_category: macro_category.clone(),
                price_list,
                availability,
                fixed_discount_pct: policy::fixed_discount(
                    &macro_category,
                    price_list,
                    policies.discount_table,
                ),
            };
            let (row, pricing_row, row_trace) = rows::assemble_row(
                &ctx,
                unit_cost,
                &markups,
                params,
                row_overrides.get(&item.sku),
            );
            seen.insert(row.sku.clone());
            upsell_rows.push(row);
            pricing_rows.push(pricing_row);
            trace.push(row_trace);
            Ok(Acceptance::Accepted)
        },
    )?;

    let validation = rows::validate_rows(&upsell_rows);
    sink.emit(
        EngineEvent::new(None, "upsell_computed", EventCategory::Selection, EventOutcome::Success)
            .with_metadata("rows", upsell_rows.len().to_string())
            .with_metadata("warnings", warnings.len().to_string()),
    );

    Ok(UpsellOutcome { rows: upsell_rows, pricing_rows, trace, validation, warnings })
}

/// Single-SKU floor/baseline query for UI hinting, without running selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumPriceQuote {
    pub sku: Sku,
    pub macro_category: MacroCategory,
    pub price_list: PriceList,
    pub unit_cost: Decimal,
    pub floor_price: Decimal,
    pub floor_markup_pct: Decimal,
    pub baseline_price: Decimal,
    pub baseline_markup_pct: Decimal,
    pub floor_source: MarkupSource,
    pub baseline_source: MarkupSource,
    pub fixed_discount_pct: Option<Decimal>,
    pub max_real_discount_pct: Decimal,
    pub exception_hit: bool,
}

/// Resolve the lowest permitted price for one SKU. Unlike the selection loop
/// there is no row to skip, so a missing SKU or unit cost is fatal here.
pub fn minimum_price(
    sku: &Sku,
    snapshot: &EngineSnapshot<'_>,
    policies: &PolicySet<'_>,
    sink: &dyn DiagnosticSink,
) -> Result<MinimumPriceQuote, EngineError> {
    let stock_item = snapshot
        .stock
        .get(sku)
        .ok_or_else(|| EngineError::SkuNotFound { sku: sku.clone() })?;
    let unit_cost = stock_item
        .unit_cost
        .filter(|cost| *cost > Decimal::ZERO)
        .ok_or_else(|| EngineError::MissingUnitCost { sku: sku.clone() })?;

    let macro_category = classify_or_abort(&stock_item.category, policies, sink)?;
    let price_list = snapshot.client.price_list;
    let markups = policy::resolve_markups(
        &macro_category,
        price_list,
        policies.discount_table,
        policies.overrides,
        policies.exceptions,
        Some(sku),
    )?;

    let floor_price = pricing::markup_price(unit_cost, markups.floor_markup_pct);
    let baseline_price = pricing::markup_price(unit_cost, markups.baseline_markup_pct);

    Ok(MinimumPriceQuote {
        sku: sku.clone(),
        macro_category: macro_category.clone(),
        price_list,
        unit_cost,
        floor_price,
        floor_markup_pct: markups.floor_markup_pct,
        baseline_price,
        baseline_markup_pct: markups.baseline_markup_pct,
        floor_source: markups.floor_source,
        baseline_source: markups.baseline_source,
        fixed_discount_pct: policy::fixed_discount(
            &macro_category,
            price_list,
            policies.discount_table,
        ),
        max_real_discount_pct: pricing::max_real_discount(baseline_price, floor_price),
        exception_hit: markups.exception_hit,
    })
}

fn classify_or_abort(
    raw_category: &str,
    policies: &PolicySet<'_>,
    sink: &dyn DiagnosticSink,
) -> Result<MacroCategory, EngineError> {
    classify::classify(raw_category, policies.category_map, sink).ok_or_else(|| {
        EngineError::UnknownCategory { category: raw_category.to_owned() }
    })
}

fn emit_skip(sink: &dyn DiagnosticSink, item: &OrderItem, reason: CandidateReason, cause: &str) {
    sink.emit(
        EngineEvent::new(
            Some(item.sku.clone()),
            "candidate_skipped",
            EventCategory::Selection,
            EventOutcome::Rejected,
        )
        .with_metadata("stage", reason.as_str())
        .with_metadata("cause", cause),
    );
}
