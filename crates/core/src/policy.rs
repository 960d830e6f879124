//! Policy tables and the markup resolver.
//!
//! Markups come from three layers: discount-table defaults, per-category
//! overrides, per-SKU exceptions. The merge is raise-only: a more specific
//! layer can strengthen a floor or baseline, never weaken it, so a stale or
//! partial override file cannot underprice a quote.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::MacroCategory;
use crate::domain::{PriceList, Sku};
use crate::errors::EngineError;

/// Hard lower bound for any markup floor, enforced at every layer.
pub const ABSOLUTE_MIN_MARKUP: Decimal = Decimal::from_parts(11, 0, 0, false, 0);

/// Default entry for one (macro-category, price list) pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefaults {
    pub floor_markup_pct: Decimal,
    #[serde(default)]
    pub baseline_markup_pct: Option<Decimal>,
    #[serde(default)]
    pub fixed_discount_pct: Option<Decimal>,
}

/// The category discount table: macro-category x price list -> defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTable {
    pub categories: BTreeMap<MacroCategory, BTreeMap<PriceList, CategoryDefaults>>,
}

impl DiscountTable {
    pub fn get(&self, macro_category: &MacroCategory, price_list: PriceList) -> Option<&CategoryDefaults> {
        self.categories.get(macro_category).and_then(|lists| lists.get(&price_list))
    }
}

/// Per-category override, scoped to one (macro-category, price list) pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupOverride {
    #[serde(default)]
    pub floor_markup_pct: Option<Decimal>,
    #[serde(default)]
    pub baseline_markup_pct: Option<Decimal>,
    #[serde(default)]
    pub note: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOverrides {
    pub categories: BTreeMap<MacroCategory, BTreeMap<PriceList, MarkupOverride>>,
}

impl CategoryOverrides {
    pub fn get(&self, macro_category: &MacroCategory, price_list: PriceList) -> Option<&MarkupOverride> {
        self.categories.get(macro_category).and_then(|lists| lists.get(&price_list))
    }
}

/// Scope of a per-SKU exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionScope {
    All,
    PriceList(PriceList),
}

impl ExceptionScope {
    pub fn applies_to(&self, price_list: PriceList) -> bool {
        match self {
            Self::All => true,
            Self::PriceList(scoped) => *scoped == price_list,
        }
    }
}

impl fmt::Display for ExceptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::PriceList(price_list) => write!(f, "{price_list}"),
        }
    }
}

/// Per-SKU baseline exception.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemException {
    pub sku: Sku,
    pub scope: ExceptionScope,
    pub baseline_markup_pct: Decimal,
    #[serde(default)]
    pub note: String,
}

/// Which layer produced a resolved markup value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupSource {
    Default,
    AbsoluteMinimum,
    CategoryOverride,
    ItemException,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMarkups {
    pub floor_markup_pct: Decimal,
    pub baseline_markup_pct: Decimal,
    pub floor_source: MarkupSource,
    pub baseline_source: MarkupSource,
    pub exception_hit: bool,
}

/// Resolve floor and baseline markups for one macro-category on one price
/// list. The source fields record the layer that last raised each value.
pub fn resolve_markups(
    macro_category: &MacroCategory,
    price_list: PriceList,
    table: &DiscountTable,
    overrides: Option<&CategoryOverrides>,
    exceptions: &[ItemException],
    sku: Option<&Sku>,
) -> Result<ResolvedMarkups, EngineError> {
    let defaults = table.get(macro_category, price_list).ok_or_else(|| {
        EngineError::MissingPolicyDefault {
            macro_category: macro_category.to_string(),
            price_list,
        }
    })?;

    let (mut floor, mut floor_source) = if defaults.floor_markup_pct >= ABSOLUTE_MIN_MARKUP {
        (defaults.floor_markup_pct, MarkupSource::Default)
    } else {
        (ABSOLUTE_MIN_MARKUP, MarkupSource::AbsoluteMinimum)
    };

    let override_entry = overrides.and_then(|layer| layer.get(macro_category, price_list));
    if let Some(floor_override) = override_entry.and_then(|entry| entry.floor_markup_pct) {
        if floor_override > floor {
            floor = floor_override;
            floor_source = MarkupSource::CategoryOverride;
        }
    }

    let (mut baseline, mut baseline_source) = match defaults.baseline_markup_pct {
        Some(base) if base > floor => (base, MarkupSource::Default),
        _ => (floor, floor_source),
    };
    if let Some(base) = override_entry.and_then(|entry| entry.baseline_markup_pct) {
        let candidate = base.max(floor);
        if candidate > baseline {
            baseline = candidate;
            baseline_source = MarkupSource::CategoryOverride;
        }
    }

    let exception = sku.and_then(|sku| pick_exception(exceptions, sku, price_list));
    if let Some(exception) = exception {
        let candidate = exception.baseline_markup_pct.max(floor);
        if candidate > baseline {
            baseline = candidate;
            baseline_source = MarkupSource::ItemException;
        }
    }

    Ok(ResolvedMarkups {
        floor_markup_pct: floor,
        baseline_markup_pct: baseline,
        floor_source,
        baseline_source,
        exception_hit: exception.is_some(),
    })
}

/// A price-list-scoped exception beats an ALL-scoped one for the same SKU.
fn pick_exception<'a>(
    exceptions: &'a [ItemException],
    sku: &Sku,
    price_list: PriceList,
) -> Option<&'a ItemException> {
    let matching: Vec<&ItemException> = exceptions
        .iter()
        .filter(|exception| &exception.sku == sku && exception.scope.applies_to(price_list))
        .collect();

    matching
        .iter()
        .copied()
        .find(|exception| matches!(exception.scope, ExceptionScope::PriceList(_)))
        .or_else(|| matching.first().copied())
}

/// Category-level fixed promotional discount, a display/audit value only.
pub fn fixed_discount(
    macro_category: &MacroCategory,
    price_list: PriceList,
    table: &DiscountTable,
) -> Option<Decimal> {
    table.get(macro_category, price_list).and_then(|defaults| defaults.fixed_discount_pct)
}

/// Structural problems in the override layers. Reported, never fatal: the
/// caller is expected to block export/finalization while any are present.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyIssue {
    #[error("override {macro_category}/{price_list} has no matching discount-table entry")]
    OverrideWithoutDefault { macro_category: MacroCategory, price_list: PriceList },
    #[error("override {macro_category}/{price_list}: floor {floor_markup_pct}% below minimum {minimum_pct}%")]
    FloorBelowMinimum {
        macro_category: MacroCategory,
        price_list: PriceList,
        floor_markup_pct: Decimal,
        minimum_pct: Decimal,
    },
    #[error("override {macro_category}/{price_list}: baseline {baseline_markup_pct}% below floor {floor_markup_pct}%")]
    BaselineBelowFloor {
        macro_category: MacroCategory,
        price_list: PriceList,
        baseline_markup_pct: Decimal,
        floor_markup_pct: Decimal,
    },
    #[error("exception {sku} ({scope}): baseline {baseline_markup_pct}% below absolute minimum {minimum_pct}%")]
    ExceptionBelowMinimum {
        sku: Sku,
        scope: ExceptionScope,
        baseline_markup_pct: Decimal,
        minimum_pct: Decimal,
    },
}

/// Validate the override layers against the discount table.
pub fn validate_policy_tables(
    table: &DiscountTable,
    overrides: Option<&CategoryOverrides>,
    exceptions: &[ItemException],
) -> Vec<PolicyIssue> {
    let mut issues = Vec::new();

    if let Some(overrides) = overrides {
        for (macro_category, lists) in &overrides.categories {
            for (price_list, entry) in lists {
                let Some(defaults) = table.get(macro_category, *price_list) else {
                    issues.push(PolicyIssue::OverrideWithoutDefault {
                        macro_category: macro_category.clone(),
                        price_list: *price_list,
                    });
                    continue;
                };

                let minimum = ABSOLUTE_MIN_MARKUP.max(defaults.floor_markup_pct);
                let floor = entry.floor_markup_pct.unwrap_or(minimum);
                if floor < minimum {
                    issues.push(PolicyIssue::FloorBelowMinimum {
                        macro_category: macro_category.clone(),
                        price_list: *price_list,
                        floor_markup_pct: floor,
                        minimum_pct: minimum,
                    });
                }

                let baseline = entry.baseline_markup_pct.unwrap_or(floor);
                if baseline < floor {
                    issues.push(PolicyIssue::BaselineBelowFloor {
                        macro_category: macro_category.clone(),
                        price_list: *price_list,
                        baseline_markup_pct: baseline,
                        floor_markup_pct: floor,
                    });
                }
            }
        }
    }

    for exception in exceptions {
        if exception.baseline_markup_pct < ABSOLUTE_MIN_MARKUP {
            issues.push(PolicyIssue::ExceptionBelowMinimum {
                sku: exception.sku.clone(),
                scope: exception.scope,
                baseline_markup_pct: exception.baseline_markup_pct,
                minimum_pct: ABSOLUTE_MIN_MARKUP,
            });
        }
    }

    issues
}
