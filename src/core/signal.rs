//! Signal types: raw perception input and the normalized signal model.
//!
//! A [`StructuredSignal`] is produced exactly once per perception and is
//! immutable afterwards. Its confidence is clamped to [0, 1] at construction
//! and has no setter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw input handed to the signal normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerceptionInput {
    /// Where the record came from.
    pub source: SignalSource,
    /// The payload, in whatever shape the source produced.
    pub raw_data: Value,
    /// When the source observed the event.
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied prior confidence (clamped during perception).
    pub confidence: f64,
}

impl PerceptionInput {
    /// Create a new perception input.
    pub fn new(
        source: SignalSource,
        raw_data: Value,
        timestamp: DateTime<Utc>,
        confidence: f64,
    ) -> Self {
        Self {
            source,
            raw_data,
            timestamp,
            confidence,
        }
    }
}

/// Provenance of a raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Produced by the surrounding application itself.
    Internal,
    /// First-party integration (CRM, billing, analytics).
    Integration,
    /// Inbound webhook from a configured partner.
    Webhook,
    /// Entered by an operator.
    Manual,
    /// Scraped or third-party data with no trust relationship.
    External,
}

impl SignalSource {
    /// Whether signals from this source keep their full confidence.
    pub fn is_trusted(&self) -> bool {
        !matches!(self, SignalSource::External)
    }
}

/// Closed set of signal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    RevenueEvent,
    LeadActivity,
    MarketChange,
    CompetitorAction,
    FounderState,
    ClientSentiment,
    RiskIndicator,
    OpportunityDetected,
}

impl SignalType {
    /// Get all signal type variants.
    pub fn all() -> &'static [SignalType] {
        &[
            SignalType::RevenueEvent,
            SignalType::LeadActivity,
            SignalType::MarketChange,
            SignalType::CompetitorAction,
            SignalType::FounderState,
            SignalType::ClientSentiment,
            SignalType::RiskIndicator,
            SignalType::OpportunityDetected,
        ]
    }

    /// The snake_case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::RevenueEvent => "revenue_event",
            SignalType::LeadActivity => "lead_activity",
            SignalType::MarketChange => "market_change",
            SignalType::CompetitorAction => "competitor_action",
            SignalType::FounderState => "founder_state",
            SignalType::ClientSentiment => "client_sentiment",
            SignalType::RiskIndicator => "risk_indicator",
            SignalType::OpportunityDetected => "opportunity_detected",
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of business entity a signal is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Lead,
    Client,
    Deal,
    Campaign,
    /// Synthetic entity for signals not tied to a specific record.
    Market,
}

/// Typed reference to the entity a signal concerns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
    pub organization_id: String,
}

/// Id used for the synthetic market entity and unknown organizations.
pub const GLOBAL_ENTITY_ID: &str = "global";

impl EntityRef {
    /// Create a new entity reference.
    pub fn new(kind: EntityKind, id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            organization_id: organization_id.into(),
        }
    }

    /// The synthetic market/global entity.
    pub fn global(organization_id: impl Into<String>) -> Self {
        Self::new(EntityKind::Market, GLOBAL_ENTITY_ID, organization_id)
    }

    /// Whether this is the synthetic market entity.
    pub fn is_global(&self) -> bool {
        self.kind == EntityKind::Market && self.id == GLOBAL_ENTITY_ID
    }
}

/// Type-shaped payload of a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalValue {
    Revenue {
        amount: f64,
        currency: String,
        #[serde(rename = "type")]
        revenue_type: String,
        recurring: bool,
    },
    LeadActivity {
        activity: String,
        score: Option<f64>,
    },
    MarketChange {
        metric: String,
        value: Option<f64>,
        change_pct: Option<f64>,
        description: Option<String>,
    },
    CompetitorAction {
        competitor: String,
        action: String,
        impact: Option<f64>,
    },
    FounderState {
        energy: Option<f64>,
        focus: Option<f64>,
        stress: Option<f64>,
        note: Option<String>,
    },
    ClientSentiment {
        /// Sentiment in [-1, 1].
        sentiment: f64,
        feedback: Option<String>,
    },
    RiskIndicator {
        risk: String,
        /// Severity in [0, 1].
        severity: f64,
        description: Option<String>,
    },
    Opportunity {
        description: String,
        estimated_value: Option<f64>,
    },
}

impl SignalValue {
    /// The signal type this payload shape belongs to.
    pub fn signal_type(&self) -> SignalType {
        match self {
            SignalValue::Revenue { .. } => SignalType::RevenueEvent,
            SignalValue::LeadActivity { .. } => SignalType::LeadActivity,
            SignalValue::MarketChange { .. } => SignalType::MarketChange,
            SignalValue::CompetitorAction { .. } => SignalType::CompetitorAction,
            SignalValue::FounderState { .. } => SignalType::FounderState,
            SignalValue::ClientSentiment { .. } => SignalType::ClientSentiment,
            SignalValue::RiskIndicator { .. } => SignalType::RiskIndicator,
            SignalValue::Opportunity { .. } => SignalType::OpportunityDetected,
        }
    }
}

/// Provenance of a perceived signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    pub source: SignalSource,
    /// Timestamp of the original observation.
    pub source_timestamp: DateTime<Utc>,
    /// Time between observation and perception, in milliseconds.
    pub processing_latency_ms: i64,
    /// Name of the classification rule that matched, if any.
    pub matched_rule: Option<String>,
}

/// A normalized observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSignal {
    id: String,
    #[serde(rename = "type")]
    signal_type: SignalType,
    entity: EntityRef,
    value: SignalValue,
    metadata: SignalMetadata,
    perceived_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_unit")]
    confidence: f64,
}

fn deserialize_unit<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_unit)
}

impl StructuredSignal {
    /// Create a new signal. Confidence is clamped to [0, 1]; NaN becomes 0.
    pub fn new(
        id: impl Into<String>,
        entity: EntityRef,
        value: SignalValue,
        metadata: SignalMetadata,
        perceived_at: DateTime<Utc>,
        confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            signal_type: value.signal_type(),
            entity,
            value,
            metadata,
            perceived_at,
            confidence: clamp_unit(confidence),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn signal_type(&self) -> SignalType {
        self.signal_type
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn value(&self) -> &SignalValue {
        &self.value
    }

    pub fn metadata(&self) -> &SignalMetadata {
        &self.metadata
    }

    pub fn perceived_at(&self) -> DateTime<Utc> {
        self.perceived_at
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Clamp a value to [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
