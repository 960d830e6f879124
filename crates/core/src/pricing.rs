//! Pricing pipeline: cost basis + resolved markups + discount dial -> price.
//!
//! All arithmetic is `Decimal`. Rounding is always ceiling-based: rounding a
//! price down could push it under the markup floor after truncation, so the
//! pipeline only ever rounds up.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::policy::ResolvedMarkups;

/// Default rounding step: whole cents.
pub const DEFAULT_ROUNDING_STEP: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Default aggressivity: half of the available discount headroom.
pub const DEFAULT_AGGRESSIVITY: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggressivityMode {
    /// The 0-100 dial scales the resolved discount cap.
    DiscountFromBaseline,
    /// Legacy stepped dial: levels 0..=3 map to fixed 0/2/4/6% discounts.
    FixedSteps,
}

/// Global knobs for one computation, supplied by the caller per call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingParams {
    pub aggressivity: Decimal,
    pub mode: AggressivityMode,
    /// External discount cap; when absent the cap is the floor headroom.
    pub max_discount_pct: Option<Decimal>,
    /// Ceiling-rounding step for final prices; `None` disables rounding.
    pub rounding_step: Option<Decimal>,
}

impl Default for PricingParams {
    fn default() -> Self {
        Self {
            aggressivity: DEFAULT_AGGRESSIVITY,
            mode: AggressivityMode::DiscountFromBaseline,
            max_discount_pct: None,
            rounding_step: Some(DEFAULT_ROUNDING_STEP),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapSource {
    FloorHeadroom,
    MaxDiscountParam,
}

/// Why a final price differs from the naively requested one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampReason {
    BelowMinimumMarkupFloor,
    PromoPriceLock,
    ManualPriceBelowFloor,
}

/// Every intermediate of one pipeline run, kept for the explain/audit twin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub baseline_price: Decimal,
    pub floor_price: Decimal,
    /// Largest discount that still lands on the floor.
    pub max_real_discount_pct: Decimal,
    pub cap_pct: Decimal,
    pub cap_source: CapSource,
    pub requested_discount_pct: Decimal,
    pub effective_discount_pct: Decimal,
    pub candidate_price: Decimal,
    pub final_price: Decimal,
    pub realized_markup_pct: Decimal,
    pub applied_discount_pct: Decimal,
    pub clamp_reason: Option<ClampReason>,
}

/// Price one unit of cost basis `unit_cost` (> 0, guaranteed by callers).
///
/// `explicit_discount_pct` bypasses the aggressivity dial: it is used verbatim
/// as the requested discount, then still clamped to the floor like any other.
pub fn price_item(
    unit_cost: Decimal,
    markups: &ResolvedMarkups,
    params: &PricingParams,
    explicit_discount_pct: Option<Decimal>,
) -> PriceBreakdown {
    let baseline_price = markup_price(unit_cost, markups.baseline_markup_pct);
    let floor_price = markup_price(unit_cost, markups.floor_markup_pct);
    let max_real_discount_pct = max_real_discount(baseline_price, floor_price);

    let (cap_pct, cap_source) = match params.max_discount_pct {
        Some(cap) => (cap, CapSource::MaxDiscountParam),
        None => (max_real_discount_pct, CapSource::FloorHeadroom),
    };

    let requested_discount_pct = match explicit_discount_pct {
        Some(pct) => pct,
        None => match params.mode {
            AggressivityMode::DiscountFromBaseline => {
                params.aggressivity / Decimal::ONE_HUNDRED * cap_pct
            }
            AggressivityMode::FixedSteps => stepped_discount(params.aggressivity),
        },
    };

    let effective_discount_pct =
        requested_discount_pct.min(max_real_discount_pct).max(Decimal::ZERO);
    let candidate_price =
        baseline_price * (Decimal::ONE - effective_discount_pct / Decimal::ONE_HUNDRED);

    let mut final_price = candidate_price;
    let mut clamp_reason = None;
    if candidate_price <= floor_price {
        final_price = floor_price;
        // Landing exactly on the floor still counts as a clamp whenever a
        // discount was actually requested.
        if requested_discount_pct > Decimal::ZERO {
            clamp_reason = Some(ClampReason::BelowMinimumMarkupFloor);
        }
    }

    final_price = ceil_to_step(final_price, params.rounding_step);
    if final_price < floor_price {
        final_price = ceil_to_step(floor_price, params.rounding_step);
        clamp_reason = Some(ClampReason::BelowMinimumMarkupFloor);
    }

    PriceBreakdown {
        baseline_price,
        floor_price,
        max_real_discount_pct,
        cap_pct,
        cap_source,
        requested_discount_pct,
        effective_discount_pct,
        candidate_price,
        final_price,
        realized_markup_pct: realized_markup(unit_cost, final_price),
        applied_discount_pct: applied_discount(baseline_price, final_price),
        clamp_reason,
    }
}

pub fn markup_price(unit_cost: Decimal, markup_pct: Decimal) -> Decimal {
    unit_cost * (Decimal::ONE + markup_pct / Decimal::ONE_HUNDRED)
}

/// Discount that would land exactly on the floor, never negative.
pub fn max_real_discount(baseline_price: Decimal, floor_price: Decimal) -> Decimal {
    if baseline_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((Decimal::ONE - floor_price / baseline_price) * Decimal::ONE_HUNDRED).max(Decimal::ZERO)
}

pub fn realized_markup(unit_cost: Decimal, final_price: Decimal) -> Decimal {
    if unit_cost <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (final_price / unit_cost - Decimal::ONE) * Decimal::ONE_HUNDRED
}

pub fn applied_discount(baseline_price: Decimal, final_price: Decimal) -> Decimal {
    if baseline_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (baseline_price - final_price) / baseline_price * Decimal::ONE_HUNDRED
}

/// Ceiling-round `value` to a multiple of `step`; identity for `None` or a
/// non-positive step.
pub fn ceil_to_step(value: Decimal, step: Option<Decimal>) -> Decimal {
    match step {
        Some(step) if step > Decimal::ZERO => (value / step).ceil() * step,
        _ => value,
    }
}

fn stepped_discount(level: Decimal) -> Decimal {
    if level == Decimal::ONE {
        Decimal::from(2)
    } else if level == Decimal::from(2) {
        Decimal::from(4)
    } else if level == Decimal::from(3) {
        Decimal::from(6)
    } else {
        Decimal::ZERO
    }
}
