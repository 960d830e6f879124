pub mod audit;
pub mod classify;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod policy;
pub mod pricing;
pub mod recommend;
pub mod rows;
pub mod selection;

pub use audit::{DiagnosticSink, EngineEvent, EventCategory, EventOutcome, InMemorySink};
pub use classify::{classify, normalize_text, CategoryMap, CategoryRule, MacroCategory};
pub use domain::{
    Availability, CauseCode, ClientInfo, OrderItem, PriceList, Provenance, Sku, StockItem,
};
pub use engine::{
    compute_upsell, minimum_price, EngineSnapshot, MinimumPriceQuote, PolicySet, UpsellOutcome,
    MAX_ROWS,
};
pub use errors::EngineError;
pub use policy::{
    fixed_discount, resolve_markups, validate_policy_tables, CategoryDefaults, CategoryOverrides,
    DiscountTable, ExceptionScope, ItemException, MarkupOverride, MarkupSource, PolicyIssue,
    ResolvedMarkups, ABSOLUTE_MIN_MARKUP,
};
pub use pricing::{
    ceil_to_step, price_item, AggressivityMode, CapSource, ClampReason, PriceBreakdown,
    PricingParams, DEFAULT_AGGRESSIVITY, DEFAULT_ROUNDING_STEP,
};
pub use recommend::{recommend_alt_offers, AltSuggestion, DEFAULT_ALT_LIMIT};
pub use rows::{
    PriceAdjustment, PricingRow, RowOverride, RowTrace, UpsellRow, ValidationError,
    ValidationResult,
};
pub use selection::{run_waterfall, Acceptance, CandidateReason};
