//! The `TransactionEnvelope` wire shape (§3, §6).

use crate::entity::{Record, SideEffects};
use crate::ids::CorrelationId;
use serde::{Deserialize, Serialize};

/// Response contract for mutating endpoints, and the payload of every
/// push event (§6). Carries one primary mutation plus zero or more ordered
/// side-effect groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub entity: Record,
    #[serde(default, skip_serializing_if = "SideEffects::is_empty")]
    pub side_effects: SideEffects,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl TransactionEnvelope {
    pub fn new(entity: Record) -> Self {
        Self {
            entity,
            side_effects: SideEffects::new(),
            correlation_id: None,
            event_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn with_event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = Some(id.into());
        self
    }
}

/// The dedup token recorded by the Transaction Processor's LRU (§4.C):
/// either the correlation id of the local write that produced this
/// envelope, or the push event's own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupToken {
    Correlation(CorrelationId),
    Event(String),
}

impl std::fmt::Display for DedupToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupToken::Correlation(c) => write!(f, "corr:{c}"),
            DedupToken::Event(e) => write!(f, "evt:{e}"),
        }
    }
}

/// Metadata accompanying an `apply` call (§4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySource {
    Http,
    Push,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyMeta {
    pub correlation_id: Option<CorrelationId>,
    pub event_id: Option<String>,
    pub source: Option<ApplySource>,
}

impl ApplyMeta {
    pub fn dedup_token(&self) -> Option<DedupToken> {
        if let Some(id) = &self.correlation_id {
            return Some(DedupToken::Correlation(id.clone()));
        }
        self.event_id.clone().map(DedupToken::Event)
    }
}
