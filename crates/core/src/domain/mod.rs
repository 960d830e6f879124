//! Immutable snapshot types consumed by the engine.
//!
//! Everything here is prepared by the (external) ingestion layer: the engine
//! never parses spreadsheets or files, it receives already-typed rows.

mod client;
mod order;
mod stock;

pub use client::{ClientInfo, PriceList};
pub use order::OrderItem;
pub use stock::{Availability, CauseCode, StockItem};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized SKU code: trimmed and uppercased on construction so map lookups
/// and override matching never depend on source-file casing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Sku {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a snapshot row came from, carried into the audit trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub file: String,
    pub row: Option<u32>,
}

impl Provenance {
    pub fn new(file: impl Into<String>, row: Option<u32>) -> Self {
        Self { file: file.into(), row }
    }
}
