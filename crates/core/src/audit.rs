use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Sku;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCategory {
    Classification,
    Policy,
    Pricing,
    Selection,
    Validation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOutcome {
    Success,
    Rejected,
    Failed,
}

/// One diagnostic event. These go to the caller's observability sink and are
/// not part of the deterministic computation trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub event_id: String,
    pub sku: Option<Sku>,
    pub event_type: String,
    pub category: EventCategory,
    pub outcome: EventOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl EngineEvent {
    pub fn new(
        sku: Option<Sku>,
        event_type: impl Into<String>,
        category: EventCategory,
        outcome: EventOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            sku,
            event_type: event_type.into(),
            category,
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

#[derive(Clone, Default)]
pub struct InMemorySink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl InMemorySink {
    pub fn events(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for InMemorySink {
    fn emit(&self, event: EngineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
