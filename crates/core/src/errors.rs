use thiserror::Error;

use crate::domain::{PriceList, Sku};

/// Fatal errors: the whole computation stops and no partial rows are returned.
/// Per-row problems (missing unit cost, unavailable stock) are never errors,
/// they degrade to warnings or skips inside the selection loop.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("category not recognized: {category}")]
    UnknownCategory { category: String },
    #[error("no discount-table entry for {macro_category} on price list {price_list}")]
    MissingPolicyDefault { macro_category: String, price_list: PriceList },
    #[error("SKU not found in stock snapshot: {sku}")]
    SkuNotFound { sku: Sku },
    #[error("base unit cost unavailable for {sku}")]
    MissingUnitCost { sku: Sku },
}
