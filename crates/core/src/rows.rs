//! Row assembly: selector candidate + resolved policy + pipeline output +
//! manual overrides -> final priced row, explain twin, and audit trace.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classify::MacroCategory;
use crate::domain::{Availability, OrderItem, PriceList, Provenance, Sku, StockItem};
use crate::policy::{MarkupSource, ResolvedMarkups};
use crate::pricing::{self, ClampReason, PriceBreakdown, PricingParams};
use crate::selection::CandidateReason;

/// Manual price adjustment for one row. A tagged variant instead of chained
/// nullable fields so the precedence is exhaustive at the type level:
/// `Locked` wins outright, then `DiscountPct`, then `AltSelected`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceAdjustment {
    #[default]
    Computed,
    Locked(Decimal),
    DiscountPct(Decimal),
    AltSelected,
}

/// Caller-supplied per-row override, keyed by SKU at the engine boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOverride {
    #[serde(default)]
    pub qty: Option<Decimal>,
    #[serde(default)]
    pub adjustment: PriceAdjustment,
}

/// One priced upsell suggestion, fully recomputed on every call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellRow {
    pub sku: Sku,
    pub description: String,
    pub brand: String,
    pub macro_category: MacroCategory,
    pub reason: CandidateReason,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub baseline_price: Decimal,
    pub floor_price: Decimal,
    pub floor_markup_pct: Decimal,
    pub realized_markup_pct: Decimal,
    pub fixed_discount_pct: Option<Decimal>,
    pub max_real_discount_pct: Decimal,
    pub requested_discount_pct: Decimal,
    pub applied_discount_pct: Decimal,
    pub clamp_reason: Option<ClampReason>,
    pub availability: Availability,
    pub promo_price: Option<Decimal>,
    pub promo_selected: bool,
    pub exception_hit: bool,
    #[serde(default)]
    pub note: String,
}

/// Explain twin of [`UpsellRow`]: the raw pipeline internals, 1:1 per row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRow {
    pub sku: Sku,
    pub breakdown: PriceBreakdown,
    pub floor_source: MarkupSource,
    pub baseline_source: MarkupSource,
    pub exception_hit: bool,
}

/// Deterministic audit record for one row: every input and intermediate, plus
/// provenance. No timestamps, no generated ids, so identical inputs serialize
/// byte-for-byte identically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTrace {
    pub sku: Sku,
    pub reason: CandidateReason,
    pub macro_category: MacroCategory,
    pub price_list: PriceList,
    pub markups: ResolvedMarkups,
    pub breakdown: PriceBreakdown,
    pub adjustment: PriceAdjustment,
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub unit_price: Decimal,
    pub fixed_discount_pct: Option<Decimal>,
    pub stock_provenance: Provenance,
    pub order_provenance: Provenance,
}

/// Structured validation failure; rows stay visible, callers block export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    BelowFloor { sku: Sku, floor_price: Decimal, unit_price: Decimal },
    PromoPriceMissing { sku: Sku },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<ValidationError>,
}

/// Cost basis for one candidate: the stock snapshot wins, the order line is
/// the fallback, zero/negative values count as absent.
pub fn resolve_unit_cost(stock_item: &StockItem, order_item: &OrderItem) -> Option<Decimal> {
    stock_item
        .unit_cost
        .or(order_item.unit_cost)
        .filter(|cost| *cost > Decimal::ZERO)
}

pub struct RowContext<'a> {
    pub order_item: &'a OrderItem,
    pub stock_item: &'a StockItem,
    pub reason: CandidateReason,
    pub macro_category: MacroCategory,
    pub price_list: PriceList,
    pub availability: Availability,
    pub fixed_discount_pct: Option<Decimal>,
}

/// Assemble one row. `unit_cost` has already been resolved (and is > 0);
/// the override has already been looked up by SKU.
pub fn assemble_row(
    ctx: &RowContext<'_>,
    unit_cost: Decimal,
    markups: &ResolvedMarkups,
    params: &PricingParams,
    row_override: Option<&RowOverride>,
) -> (UpsellRow, PricingRow, RowTrace) {
    let adjustment =
        row_override.map(|o| o.adjustment.clone()).unwrap_or(PriceAdjustment::Computed);

    let explicit_discount = match &adjustment {
        PriceAdjustment::DiscountPct(pct) => Some(*pct),
        _ => None,
    };
    let mut breakdown = pricing::price_item(unit_cost, markups, params, explicit_discount);

    let promo_price = ctx.stock_item.fixed_promo_price();
    let mut promo_selected = false;
    match &adjustment {
        PriceAdjustment::Locked(price) => {
            // A manual price wins outright but may not undercut the floor.
            let mut locked = *price;
            if locked < breakdown.floor_price {
                locked = breakdown.floor_price;
                breakdown.clamp_reason = Some(ClampReason::ManualPriceBelowFloor);
            } else {
                breakdown.clamp_reason = None;
            }
            breakdown.final_price = pricing::ceil_to_step(locked, params.rounding_step);
        }
        PriceAdjustment::AltSelected => {
            promo_selected = true;
            // The promo price is fixed by the business: rounded, never
            // re-discounted, floor bypassed. A missing promo price keeps the
            // computed price and is caught by validation.
            if let Some(promo) = promo_price {
                breakdown.final_price = pricing::ceil_to_step(promo, params.rounding_step);
                breakdown.clamp_reason = Some(ClampReason::PromoPriceLock);
            }
        }
        PriceAdjustment::Computed | PriceAdjustment::DiscountPct(_) => {}
    }
    breakdown.realized_markup_pct = pricing::realized_markup(unit_cost, breakdown.final_price);
    breakdown.applied_discount_pct =
        pricing::applied_discount(breakdown.baseline_price, breakdown.final_price);

    let qty = row_override
        .and_then(|o| o.qty)
        .unwrap_or(ctx.order_item.qty)
        .max(Decimal::ONE);
    let line_total =
        pricing::ceil_to_step(breakdown.final_price * qty, params.rounding_step);

    let row = UpsellRow {
        sku: ctx.order_item.sku.clone(),
        description: ctx.order_item.description.clone(),
        brand: ctx.order_item.brand.clone(),
        macro_category: ctx.macro_category.clone(),
        reason: ctx.reason,
        qty,
        unit_cost,
        unit_price: breakdown.final_price,
        line_total,
        baseline_price: breakdown.baseline_price,
        floor_price: breakdown.floor_price,
        floor_markup_pct: markups.floor_markup_pct,
        realized_markup_pct: breakdown.realized_markup_pct,
        fixed_discount_pct: ctx.fixed_discount_pct,
        max_real_discount_pct: breakdown.max_real_discount_pct,
        requested_discount_pct: breakdown.requested_discount_pct,
        applied_discount_pct: breakdown.applied_discount_pct,
        clamp_reason: breakdown.clamp_reason,
        availability: ctx.availability,
        promo_price,
        promo_selected,
        exception_hit: markups.exception_hit,
        note: String::new(),
    };
    let pricing_row = PricingRow {
        sku: row.sku.clone(),
        breakdown: breakdown.clone(),
        floor_source: markups.floor_source,
        baseline_source: markups.baseline_source,
        exception_hit: markups.exception_hit,
    };
    let trace = RowTrace {
        sku: row.sku.clone(),
        reason: ctx.reason,
        macro_category: ctx.macro_category.clone(),
        price_list: ctx.price_list,
        markups: markups.clone(),
        breakdown,
        adjustment,
        qty,
        unit_cost,
        unit_price: row.unit_price,
        fixed_discount_pct: ctx.fixed_discount_pct,
        stock_provenance: ctx.stock_item.provenance.clone(),
        order_provenance: ctx.order_item.provenance.clone(),
    };
    (row, pricing_row, trace)
}

/// Floor check over assembled rows. Promo-locked rows are exempt from the
/// floor but must actually carry a promo price.
pub fn validate_rows(rows: &[UpsellRow]) -> ValidationResult {
    let mut errors = Vec::new();
    for row in rows {
        if row.promo_selected {
            if row.promo_price.is_none() {
                errors.push(ValidationError::PromoPriceMissing { sku: row.sku.clone() });
            }
            continue;
        }
        if row.unit_price < row.floor_price {
            errors.push(ValidationError::BelowFloor {
                sku: row.sku.clone(),
                floor_price: row.floor_price,
                unit_price: row.unit_price,
            });
        }
    }
    ValidationResult { ok: errors.is_empty(), errors }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        assemble_row, resolve_unit_cost, validate_rows, PriceAdjustment, RowContext, RowOverride,
        ValidationError,
    };
    use crate::classify::MacroCategory;
    use crate::domain::{Availability, OrderItem, PriceList, Provenance, Sku, StockItem};
    use crate::policy::{MarkupSource, ResolvedMarkups};
    use crate::pricing::{ClampReason, PricingParams};
    use crate::selection::CandidateReason;

    fn order_item() -> OrderItem {
        OrderItem {
            brand: "ACME".to_owned(),
            category: "TONER".to_owned(),
            sku: Sku::new("TN-1"),
            description: "TONER BLACK".to_owned(),
            qty: Decimal::from(2),
            unit_price: Decimal::from(118),
            unit_cost: Some(Decimal::from(95)),
            provenance: Provenance::new("ORDER.xlsx", Some(4)),
        }
    }

    fn stock_item(promo: Option<i64>) -> StockItem {
        StockItem {
            category: "TONER".to_owned(),
            brand: "ACME".to_owned(),
            sku: Sku::new("TN-1"),
            description: "TONER BLACK".to_owned(),
            on_hand: Decimal::from(8),
            incoming: Decimal::ZERO,
            incoming_date: None,
            price_riv: Decimal::from(120),
            price_riv10: Decimal::from(132),
            price_dist: Decimal::from(110),
            unit_cost: Some(Decimal::from(100)),
            promo_price: promo.map(Decimal::from),
            provenance: Provenance::new("STOCK.xlsx", Some(7)),
        }
    }

    fn markups() -> ResolvedMarkups {
        ResolvedMarkups {
            floor_markup_pct: Decimal::from(11),
            baseline_markup_pct: Decimal::from(20),
            floor_source: MarkupSource::Default,
            baseline_source: MarkupSource::Default,
            exception_hit: false,
        }
    }

    fn ctx<'a>(order: &'a OrderItem, stock: &'a StockItem) -> RowContext<'a> {
        RowContext {
            order_item: order,
            stock_item: stock,
            reason: CandidateReason::HistoricalFallback,
            macro_category: MacroCategory::new("TONER"),
            price_list: PriceList::Riv,
            availability: Availability::InStock,
            fixed_discount_pct: None,
        }
    }

    #[test]
    fn stock_cost_wins_over_order_line_cost() {
        let order = order_item();
        assert_eq!(resolve_unit_cost(&stock_item(None), &order), Some(Decimal::from(100)));

        let mut no_cost = stock_item(None);
        no_cost.unit_cost = None;
        assert_eq!(resolve_unit_cost(&no_cost, &order), Some(Decimal::from(95)));

        let mut bare = order;
        bare.unit_cost = None;
        assert_eq!(resolve_unit_cost(&no_cost, &bare), None);
    }

    #[test]
    fn locked_price_wins_but_is_raised_to_the_floor() {
        let order = order_item();
        let stock = stock_item(None);
        let locked = RowOverride {
            qty: None,
            adjustment: PriceAdjustment::Locked(Decimal::from(90)),
        };
        let (row, _, trace) = assemble_row(
            &ctx(&order, &stock),
            Decimal::from(100),
            &markups(),
            &PricingParams::default(),
            Some(&locked),
        );
        assert_eq!(row.unit_price, Decimal::from(111));
        assert_eq!(row.clamp_reason, Some(ClampReason::ManualPriceBelowFloor));
        assert_eq!(trace.adjustment, PriceAdjustment::Locked(Decimal::from(90)));
    }

    #[test]
    fn locked_price_above_the_floor_is_kept_and_rounded() {
        let order = order_item();
        let stock = stock_item(None);
        let locked = RowOverride {
            qty: None,
            adjustment: PriceAdjustment::Locked(Decimal::new(114005, 3)),
        };
        let (row, _, _) = assemble_row(
            &ctx(&order, &stock),
            Decimal::from(100),
            &markups(),
            &PricingParams::default(),
            Some(&locked),
        );
        assert_eq!(row.unit_price, Decimal::new(11401, 2));
        assert_eq!(row.clamp_reason, None);
    }

    #[test]
    fn alt_selection_substitutes_the_promo_price_and_bypasses_the_floor() {
        let order = order_item();
        let stock = stock_item(Some(89));
        let alt = RowOverride { qty: None, adjustment: PriceAdjustment::AltSelected };
        let (row, _, _) = assemble_row(
            &ctx(&order, &stock),
            Decimal::from(100),
            &markups(),
            &PricingParams::default(),
            Some(&alt),
        );
        // 89 is below the 111 floor; the promo lock allows it.
        assert_eq!(row.unit_price, Decimal::from(89));
        assert_eq!(row.clamp_reason, Some(ClampReason::PromoPriceLock));
        assert!(row.promo_selected);
        assert!(validate_rows(&[row]).ok);
    }

    #[test]
    fn alt_selection_without_a_promo_price_fails_validation() {
        let order = order_item();
        let stock = stock_item(None);
        let alt = RowOverride { qty: None, adjustment: PriceAdjustment::AltSelected };
        let (row, _, _) = assemble_row(
            &ctx(&order, &stock),
            Decimal::from(100),
            &markups(),
            &PricingParams::default(),
            Some(&alt),
        );
        let validation = validate_rows(&[row]);
        assert!(!validation.ok);
        assert!(matches!(validation.errors[0], ValidationError::PromoPriceMissing { .. }));
    }

    #[test]
    fn qty_override_replaces_order_qty_with_a_minimum_of_one() {
        let order = order_item();
        let stock = stock_item(None);
        let zero_qty = RowOverride {
            qty: Some(Decimal::ZERO),
            adjustment: PriceAdjustment::Computed,
        };
        let (row, _, _) = assemble_row(
            &ctx(&order, &stock),
            Decimal::from(100),
            &markups(),
            &PricingParams::default(),
            Some(&zero_qty),
        );
        assert_eq!(row.qty, Decimal::ONE);
        assert_eq!(row.line_total, row.unit_price);
    }

    #[test]
    fn discount_override_feeds_the_pipeline_and_respects_the_floor() {
        let order = order_item();
        let stock = stock_item(None);
        let discount = RowOverride {
            qty: None,
            adjustment: PriceAdjustment::DiscountPct(Decimal::from(30)),
        };
        let (row, pricing_row, _) = assemble_row(
            &ctx(&order, &stock),
            Decimal::from(100),
            &markups(),
            &PricingParams::default(),
            Some(&discount),
        );
        assert_eq!(row.unit_price, Decimal::from(111));
        assert_eq!(row.clamp_reason, Some(ClampReason::BelowMinimumMarkupFloor));
        assert_eq!(pricing_row.breakdown.requested_discount_pct, Decimal::from(30));
        assert!(validate_rows(&[row]).ok);
    }

    #[test]
    fn below_floor_rows_are_flagged_but_kept() {
        let order = order_item();
        let stock = stock_item(None);
        let (mut row, _, _) = assemble_row(
            &ctx(&order, &stock),
            Decimal::from(100),
            &markups(),
            &PricingParams::default(),
            None,
        );
        row.unit_price = Decimal::from(105);

        let validation = validate_rows(&[row]);
        assert!(!validation.ok);
        assert!(matches!(
            validation.errors[0],
            ValidationError::BelowFloor { ref floor_price, .. } if *floor_price == Decimal::from(111)
        ));
    }
}
