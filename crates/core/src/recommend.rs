//! Alternate-offer recommender: promotional fixed-price cross-sells ranked by
//! the customer's historical category/brand affinity.
//!
//! Purely additive: suggestions come from catalog items NOT in the quote and
//! never compete with selector rows.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::{DiagnosticSink, EngineEvent, EventCategory, EventOutcome};
use crate::classify::{self, CategoryMap, MacroCategory};
use crate::domain::Sku;
use crate::engine::EngineSnapshot;

/// Default number of suggestions returned.
pub const DEFAULT_ALT_LIMIT: usize = 3;

const TOP_AFFINITY: usize = 5;
const CATEGORY_POINTS: i32 = 2;
const BRAND_POINTS: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltSuggestion {
    pub sku: Sku,
    pub description: String,
    pub brand: String,
    pub macro_category: MacroCategory,
    pub promo_price: Decimal,
    pub available_total: Decimal,
    pub category_match: bool,
    pub brand_match: bool,
    pub score: i32,
}

/// Rank promo-priced catalog items absent from the quote. Candidates whose
/// category cannot be classified are skipped with a diagnostic, never fatal.
pub fn recommend_alt_offers(
    snapshot: &EngineSnapshot<'_>,
    category_map: &CategoryMap,
    limit: usize,
    sink: &dyn DiagnosticSink,
) -> Vec<AltSuggestion> {
    let quoted: BTreeSet<&Sku> = snapshot
        .current_order
        .iter()
        .chain(snapshot.historical_orders)
        .map(|item| &item.sku)
        .collect();

    let mut category_counts: BTreeMap<MacroCategory, usize> = BTreeMap::new();
    let mut brand_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in snapshot.historical_orders {
        if let Some(macro_category) = classify::classify(&item.category, category_map, sink) {
            *category_counts.entry(macro_category).or_default() += 1;
        }
        *brand_counts.entry(item.brand.as_str()).or_default() += 1;
    }
    let top_categories = top_keys(&category_counts);
    let top_brands = top_keys(&brand_counts);

    let mut suggestions: Vec<AltSuggestion> = Vec::new();
    for (sku, stock_item) in snapshot.stock {
        if quoted.contains(sku) {
            continue;
        }
        let Some(promo_price) = stock_item.fixed_promo_price() else { continue };
        let Some(macro_category) = classify::classify(&stock_item.category, category_map, sink)
        else {
            sink.emit(
                EngineEvent::new(
                    Some(sku.clone()),
                    "alt_candidate_skipped",
                    EventCategory::Selection,
                    EventOutcome::Rejected,
                )
                .with_metadata("category", stock_item.category.clone()),
            );
            continue;
        };

        let category_match = top_categories.contains(&macro_category);
        let brand_match = top_brands.contains(&stock_item.brand.as_str());
        let score = if category_match { CATEGORY_POINTS } else { 0 }
            + if brand_match { BRAND_POINTS } else { 0 };
        suggestions.push(AltSuggestion {
            sku: sku.clone(),
            description: stock_item.description.clone(),
            brand: stock_item.brand.clone(),
            macro_category,
            promo_price,
            available_total: stock_item.total_available(),
            category_match,
            brand_match,
            score,
        });
    }

    suggestions.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.available_total.cmp(&a.available_total))
            .then(a.sku.cmp(&b.sku))
    });
    suggestions.truncate(limit);
    suggestions
}

/// Top-N keys by count, ties broken by key order for determinism.
fn top_keys<K: Clone + Ord>(counts: &BTreeMap<K, usize>) -> BTreeSet<K> {
    let mut ranked: Vec<(&K, usize)> = counts.iter().map(|(key, count)| (key, *count)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked.into_iter().take(TOP_AFFINITY).map(|(key, _)| key.clone()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{recommend_alt_offers, DEFAULT_ALT_LIMIT};
    use crate::audit::InMemorySink;
    use crate::classify::{CategoryMap, CategoryRule, MacroCategory};
    use crate::domain::{ClientInfo, OrderItem, PriceList, Provenance, Sku, StockItem};
    use crate::engine::EngineSnapshot;

    fn client() -> ClientInfo {
        ClientInfo {
            id: "C001".to_owned(),
            name: "ACME SRL".to_owned(),
            price_list: PriceList::Riv,
            category: "RIVENDITORE".to_owned(),
        }
    }

    fn category_map() -> CategoryMap {
        CategoryMap::new(vec![
            CategoryRule {
                macro_category: MacroCategory::new("TONER"),
                patterns: vec!["TONER".to_owned()],
            },
            CategoryRule {
                macro_category: MacroCategory::new("CARTA"),
                patterns: vec!["CARTA".to_owned()],
            },
        ])
    }

    fn historical(sku: &str, brand: &str, category: &str) -> OrderItem {
        OrderItem {
            brand: brand.to_owned(),
            category: category.to_owned(),
            sku: Sku::new(sku),
            description: category.to_owned(),
            qty: Decimal::ONE,
            unit_price: Decimal::from(50),
            unit_cost: None,
            provenance: Provenance::new("HIST.xlsx", None),
        }
    }

    fn promo_stock(sku: &str, brand: &str, category: &str, promo: Option<i64>, on_hand: i64) -> StockItem {
        StockItem {
            category: category.to_owned(),
            brand: brand.to_owned(),
            sku: Sku::new(sku),
            description: format!("{category} {sku}"),
            on_hand: Decimal::from(on_hand),
            incoming: Decimal::ZERO,
            incoming_date: None,
            price_riv: Decimal::from(100),
            price_riv10: Decimal::from(110),
            price_dist: Decimal::from(90),
            unit_cost: Some(Decimal::from(70)),
            promo_price: promo.map(Decimal::from),
            provenance: Provenance::new("STOCK.xlsx", None),
        }
    }

    fn stock_map(items: Vec<StockItem>) -> BTreeMap<Sku, StockItem> {
        items.into_iter().map(|item| (item.sku.clone(), item)).collect()
    }

    #[test]
    fn affinity_scoring_ranks_category_over_brand() {
        let client = client();
        let history = vec![
            historical("H1", "ACME", "TONER NERO"),
            historical("H2", "ACME", "TONER CIANO"),
            historical("H3", "OTHER", "CARTA A4"),
        ];
        let stock = stock_map(vec![
            // Top category (+2), unseen brand.
            promo_stock("P-CAT", "NEW", "TONER XL", Some(40), 5),
            // Top category (+2) and top brand (+1).
            promo_stock("P-BOTH", "ACME", "CARTA A3", Some(30), 5),
            // Top brand only (+1): BATTERIE never appears in the history.
            promo_stock("P-BRAND", "OTHER", "BATTERIE STILO", Some(20), 5),
            // No promo price: never suggested.
            promo_stock("P-NONE", "ACME", "TONER XXL", None, 50),
        ]);
        let snapshot = EngineSnapshot {
            client: &client,
            stock: &stock,
            current_order: &[],
            historical_orders: &history,
        };
        let sink = InMemorySink::default();

        let suggestions =
            recommend_alt_offers(&snapshot, &category_map(), DEFAULT_ALT_LIMIT, &sink);
        let ranked: Vec<(&str, i32)> =
            suggestions.iter().map(|s| (s.sku.as_str(), s.score)).collect();
        assert_eq!(ranked, vec![("P-BOTH", 3), ("P-CAT", 2), ("P-BRAND", 1)]);
    }

    #[test]
    fn quoted_skus_are_never_suggested() {
        let client = client();
        let current = vec![historical("P-CUR", "ACME", "TONER NERO")];
        let history = vec![historical("P-HIST", "ACME", "TONER NERO")];
        let stock = stock_map(vec![
            promo_stock("P-CUR", "ACME", "TONER XL", Some(40), 5),
            promo_stock("P-HIST", "ACME", "TONER XL", Some(40), 5),
            promo_stock("P-NEW", "ACME", "TONER XL", Some(40), 5),
        ]);
        let snapshot = EngineSnapshot {
            client: &client,
            stock: &stock,
            current_order: &current,
            historical_orders: &history,
        };
        let sink = InMemorySink::default();

        let suggestions = recommend_alt_offers(&snapshot, &category_map(), 10, &sink);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].sku, Sku::new("P-NEW"));
    }

    #[test]
    fn ties_break_on_total_availability_then_sku() {
        let client = client();
        let history = vec![historical("H1", "ACME", "TONER NERO")];
        let stock = stock_map(vec![
            promo_stock("P-A", "ACME", "TONER A", Some(40), 2),
            promo_stock("P-B", "ACME", "TONER B", Some(40), 9),
            promo_stock("P-C", "ACME", "TONER C", Some(40), 2),
        ]);
        let snapshot = EngineSnapshot {
            client: &client,
            stock: &stock,
            current_order: &[],
            historical_orders: &history,
        };
        let sink = InMemorySink::default();

        let suggestions = recommend_alt_offers(&snapshot, &category_map(), 10, &sink);
        let skus: Vec<&str> = suggestions.iter().map(|s| s.sku.as_str()).collect();
        assert_eq!(skus, vec!["P-B", "P-A", "P-C"]);
    }

    #[test]
    fn unclassifiable_candidates_are_skipped_with_a_diagnostic() {
        let client = client();
        let history = vec![historical("H1", "ACME", "TONER NERO")];
        let stock = stock_map(vec![promo_stock("P-X", "ACME", "ARREDO UFFICIO", Some(40), 5)]);
        let snapshot = EngineSnapshot {
            client: &client,
            stock: &stock,
            current_order: &[],
            historical_orders: &history,
        };
        let sink = InMemorySink::default();

        let suggestions = recommend_alt_offers(&snapshot, &category_map(), 10, &sink);
        assert!(suggestions.is_empty());
        assert!(sink
            .events()
            .iter()
            .any(|event| event.event_type == "alt_candidate_skipped"));
    }
}
