use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Provenance, Sku};

/// One line of an order file. Current-order lines and historical lines share
/// the same shape; the engine tells them apart only by which slice they sit in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub brand: String,
    pub category: String,
    pub sku: Sku,
    pub description: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    /// Base unit cost (LM) as carried on the order line, when the file had one.
    pub unit_cost: Option<Decimal>,
    pub provenance: Provenance,
}
