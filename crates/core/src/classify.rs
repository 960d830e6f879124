//! Category classifier: raw free-text product categories to macro-categories.
//!
//! The classifier fails closed. An unrecognized category returns `None` and a
//! diagnostic event; callers must never substitute a guessed macro-category.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::audit::{DiagnosticSink, EngineEvent, EventCategory, EventOutcome};

/// Normalized macro-category tag, the key into every policy table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct MacroCategory(String);

impl MacroCategory {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MacroCategory {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for MacroCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One configured macro-category with its match substrings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub macro_category: MacroCategory,
    pub patterns: Vec<String>,
}

/// Ordered rule table. Entry order is the tie-break: the first matching rule
/// wins, so callers control precedence by how they order the table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMap {
    pub entries: Vec<CategoryRule>,
}

impl CategoryMap {
    pub fn new(entries: Vec<CategoryRule>) -> Self {
        Self { entries }
    }
}

/// Last-resort token heuristics, applied only when no configured rule matches.
const TOKEN_HEURISTICS: &[(&str, &str)] = &[
    ("BATTER", "BATTERIE"),
    ("CANCELL", "CANCELLERIA"),
    ("CARTA", "CARTA"),
    ("ROTOL", "ROTOLI TERMICI"),
    ("REMAN", "REMAN"),
    ("ORIG", "ORIGINALI"),
    ("STORAGE", "STORAGE"),
    ("TIMBR", "TIMBRI"),
];

/// Uppercase, fold the accented vowels that occur in the source data, and
/// collapse whitespace/separator runs to single spaces.
pub fn normalize_text(value: &str) -> String {
    let mut text = String::with_capacity(value.len());
    for ch in value.chars() {
        let ch = match ch {
            '/' | '_' | '-' => ' ',
            other => other,
        };
        for upper in ch.to_uppercase() {
            text.push(match upper {
                'À' => 'A',
                'È' | 'É' => 'E',
                'Ì' => 'I',
                'Ò' => 'O',
                'Ù' => 'U',
                other => other,
            });
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a raw category to a macro-category, or `None` when nothing matches.
/// A miss is recorded on the sink so operators can extend the rule table.
pub fn classify(
    raw_category: &str,
    map: &CategoryMap,
    sink: &dyn DiagnosticSink,
) -> Option<MacroCategory> {
    let normalized = normalize_text(raw_category);

    for rule in &map.entries {
        for pattern in &rule.patterns {
            let pattern = normalize_text(pattern);
            if !pattern.is_empty() && normalized.contains(&pattern) {
                return Some(rule.macro_category.clone());
            }
        }
    }

    for (token, macro_category) in TOKEN_HEURISTICS {
        if normalized.contains(token) {
            return Some(MacroCategory::new(*macro_category));
        }
    }

    sink.emit(
        EngineEvent::new(
            None,
            "category_not_recognized",
            EventCategory::Classification,
            EventOutcome::Rejected,
        )
        .with_metadata("category", raw_category),
    );
    None
}
