use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PriceList, Provenance, Sku};

/// Delivery scenario selected for the whole computation. Governs which stock
/// signal decides whether a candidate can be offered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseCode {
    Immediate,
    Arriving,
    Scheduled,
}

/// Outcome of the availability check for one stock item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    FromDate(NaiveDate),
    Unavailable,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    pub fn available_from(&self) -> Option<NaiveDate> {
        match self {
            Self::FromDate(date) => Some(*date),
            _ => None,
        }
    }
}

/// Snapshot of one catalog SKU, keyed by code in the stock map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub category: String,
    pub brand: String,
    pub sku: Sku,
    pub description: String,
    pub on_hand: Decimal,
    pub incoming: Decimal,
    pub incoming_date: Option<NaiveDate>,
    pub price_riv: Decimal,
    pub price_riv10: Decimal,
    pub price_dist: Decimal,
    /// Base unit cost (LM). `None` when the snapshot carried no usable value.
    pub unit_cost: Option<Decimal>,
    /// Fixed promotional price for ALT cross-sells, exempt from discounting.
    pub promo_price: Option<Decimal>,
    pub provenance: Provenance,
}

impl StockItem {
    pub fn list_price(&self, price_list: PriceList) -> Decimal {
        match price_list {
            PriceList::Riv => self.price_riv,
            PriceList::Riv10 => self.price_riv10,
            PriceList::Dist => self.price_dist,
        }
    }

    /// Promo price, treating zero/negative snapshot values as absent.
    pub fn fixed_promo_price(&self) -> Option<Decimal> {
        self.promo_price.filter(|price| *price > Decimal::ZERO)
    }

    pub fn total_available(&self) -> Decimal {
        self.on_hand + self.incoming
    }

    /// Availability state machine. Only the scheduled cause looks at incoming
    /// quantities; the other causes require stock on hand today.
    pub fn availability(&self, cause: CauseCode) -> Availability {
        match cause {
            CauseCode::Immediate | CauseCode::Arriving => {
                if self.on_hand > Decimal::ZERO {
                    Availability::InStock
                } else {
                    Availability::Unavailable
                }
            }
            CauseCode::Scheduled => {
                if self.on_hand > Decimal::ZERO {
                    Availability::InStock
                } else {
                    match self.incoming_date {
                        Some(date) if self.incoming > Decimal::ZERO => Availability::FromDate(date),
                        _ => Availability::Unavailable,
                    }
                }
            }
        }
    }
}
