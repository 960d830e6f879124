//! Candidate selector: the three-stage upsell waterfall.
//!
//! The waterfall only decides candidate ORDER. Acceptance (dedup, cap,
//! availability, policy, pricing) lives in the caller's accumulator so the
//! stages stay a pure description of the selection strategy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::normalize_text;
use crate::domain::{OrderItem, Sku, StockItem};
use crate::errors::EngineError;

/// Why a candidate entered the waterfall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateReason {
    ColorMatchBlack,
    CurrentStockAvailable,
    HistoricalFallback,
}

impl CandidateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColorMatchBlack => "color_match_black",
            Self::CurrentStockAvailable => "current_stock_available",
            Self::HistoricalFallback => "historical_fallback",
        }
    }
}

/// Accumulator verdict for one probed candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    Skipped,
    CapReached,
}

const COLOR_TOKENS: &[&str] = &["CYAN", "MAGENTA", "YELLOW"];

/// Drive the waterfall, probing candidates through `try_accept` strictly in
/// stage order until the accumulator reports its cap.
pub fn run_waterfall<F>(
    current: &[OrderItem],
    historical: &[OrderItem],
    stock: &BTreeMap<Sku, StockItem>,
    mut try_accept: F,
) -> Result<(), EngineError>
where
    F: FnMut(&OrderItem, CandidateReason) -> Result<Acceptance, EngineError>,
{
    // Stage 1: a color cartridge on the current order is a lead for the
    // matching black one from the customer's history. One probe per line.
    for item in current {
        let description = normalize_text(&item.description);
        if !COLOR_TOKENS.iter().any(|token| description.contains(token)) {
            continue;
        }
        let probe = historical.iter().find(|hist| {
            hist.brand == item.brand && normalize_text(&hist.description).contains("BLACK")
        });
        if let Some(hist) = probe {
            if try_accept(hist, CandidateReason::ColorMatchBlack)? == Acceptance::CapReached {
                return Ok(());
            }
        }
    }

    // Stage 2: restock what is already being bought, when stock on hand
    // exceeds the ordered quantity.
    for item in current {
        let Some(stock_item) = stock.get(&item.sku) else { continue };
        if stock_item.on_hand <= item.qty {
            continue;
        }
        if try_accept(item, CandidateReason::CurrentStockAvailable)? == Acceptance::CapReached {
            return Ok(());
        }
    }

    // Stage 3: historical lines absent from the current order, in scan order.
    let current_by_code: BTreeMap<&Sku, &OrderItem> =
        current.iter().map(|item| (&item.sku, item)).collect();
    let historical_by_code: BTreeMap<&Sku, &OrderItem> =
        historical.iter().map(|item| (&item.sku, item)).collect();
    for hist in historical {
        if current_by_code.contains_key(&hist.sku) {
            continue;
        }
        // TODO: confirm duplicate-code histories never diverge from the
        // by-code map before dropping this filter.
        if !historical_by_code.contains_key(&hist.sku) {
            continue;
        }
        if try_accept(hist, CandidateReason::HistoricalFallback)? == Acceptance::CapReached {
            return Ok(());
        }
    }

    Ok(())
}
