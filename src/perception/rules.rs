//! Ordered classification and entity extraction rules.
//!
//! Classification is a table of `(name, predicate, SignalType)` entries
//! evaluated top to bottom; the first match wins. Inputs no rule matches fall
//! back to [`DEFAULT_SIGNAL_TYPE`] instead of failing.

use serde_json::{Map, Value};

use crate::core::{EntityKind, EntityRef, SignalType, GLOBAL_ENTITY_ID};

/// Signal type assigned when no rule matches.
pub const DEFAULT_SIGNAL_TYPE: SignalType = SignalType::MarketChange;

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    /// Stable rule name, recorded in signal metadata.
    pub name: &'static str,
    pub signal_type: SignalType,
    pub predicate: fn(&Map<String, Value>) -> bool,
}

impl ClassificationRule {
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        (self.predicate)(payload)
    }
}

/// The classification table, in priority order.
pub static CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "payment_amount",
        signal_type: SignalType::RevenueEvent,
        predicate: is_payment,
    },
    ClassificationRule {
        name: "lead_engagement",
        signal_type: SignalType::LeadActivity,
        predicate: is_lead_engagement,
    },
    ClassificationRule {
        name: "client_feedback",
        signal_type: SignalType::ClientSentiment,
        predicate: is_client_feedback,
    },
    ClassificationRule {
        name: "competitor_move",
        signal_type: SignalType::CompetitorAction,
        predicate: is_competitor_move,
    },
    ClassificationRule {
        name: "founder_wellbeing",
        signal_type: SignalType::FounderState,
        predicate: is_founder_state,
    },
    ClassificationRule {
        name: "risk_marker",
        signal_type: SignalType::RiskIndicator,
        predicate: is_risk_marker,
    },
    ClassificationRule {
        name: "opportunity_marker",
        signal_type: SignalType::OpportunityDetected,
        predicate: is_opportunity,
    },
    ClassificationRule {
        name: "market_movement",
        signal_type: SignalType::MarketChange,
        predicate: is_market_movement,
    },
];

const PAYMENT_ID_KEYS: &[&str] = &[
    "payment_id",
    "invoice_id",
    "charge_id",
    "subscription_id",
    "transaction_id",
];

const PAYMENT_KINDS: &[&str] = &[
    "payment",
    "charge",
    "invoice",
    "refund",
    "subscription",
    "renewal",
    "purchase",
];

const ENGAGEMENT_KEYS: &[&str] = &[
    "engagement",
    "email_opened",
    "link_clicked",
    "replied",
    "page_view",
];

/// Find the first rule matching a payload.
///
/// Non-object payloads never match.
pub fn classify(raw: &Value) -> Option<&'static ClassificationRule> {
    let payload = raw.as_object()?;
    CLASSIFICATION_RULES.iter().find(|rule| rule.matches(payload))
}

/// Resolve which entity a payload is about.
///
/// Falls back to the synthetic market entity when no id is present.
pub fn extract_entity(raw: &Value) -> EntityRef {
    const ENTITY_KEYS: &[(&str, EntityKind)] = &[
        ("lead_id", EntityKind::Lead),
        ("client_id", EntityKind::Client),
        ("customer_id", EntityKind::Client),
        ("deal_id", EntityKind::Deal),
        ("campaign_id", EntityKind::Campaign),
    ];

    let Some(payload) = raw.as_object() else {
        return EntityRef::global(GLOBAL_ENTITY_ID);
    };

    let organization_id = id_field(payload, "organization_id")
        .or_else(|| id_field(payload, "org_id"))
        .unwrap_or_else(|| GLOBAL_ENTITY_ID.to_string());

    ENTITY_KEYS
        .iter()
        .find_map(|(key, kind)| id_field(payload, key).map(|id| (id, *kind)))
        .map(|(id, kind)| EntityRef::new(kind, id, organization_id.clone()))
        .unwrap_or_else(|| EntityRef::global(organization_id))
}

/// Whether a key is present with a non-null value.
pub(crate) fn has(payload: &Map<String, Value>, key: &str) -> bool {
    payload.get(key).is_some_and(|v| !v.is_null())
}

fn has_any(payload: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| has(payload, key))
}

/// Read an identifier that may be a string or a number.
fn id_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind_field_in(payload: &Map<String, Value>, allowed: &[&str]) -> bool {
    ["type", "event"].iter().any(|key| {
        payload
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|kind| allowed.contains(&kind.to_lowercase().as_str()))
    })
}

fn is_payment(payload: &Map<String, Value>) -> bool {
    has(payload, "amount")
        && (has_any(payload, PAYMENT_ID_KEYS) || kind_field_in(payload, PAYMENT_KINDS))
}

fn is_lead_engagement(payload: &Map<String, Value>) -> bool {
    has(payload, "lead_id") || has_any(payload, ENGAGEMENT_KEYS)
}

fn is_client_feedback(payload: &Map<String, Value>) -> bool {
    has_any(payload, &["sentiment", "nps", "csat"])
}

fn is_competitor_move(payload: &Map<String, Value>) -> bool {
    has_any(payload, &["competitor", "competitor_id"])
}

fn is_founder_state(payload: &Map<String, Value>) -> bool {
    has_any(payload, &["founder_id", "energy", "stress", "burnout"])
}

fn is_risk_marker(payload: &Map<String, Value>) -> bool {
    has_any(payload, &["risk", "risk_score", "churn_risk", "severity", "alert"])
}

fn is_opportunity(payload: &Map<String, Value>) -> bool {
    has_any(payload, &["opportunity", "opportunity_id"])
}

fn is_market_movement(payload: &Map<String, Value>) -> bool {
    has_any(payload, &["market", "trend", "index", "market_signal"])
}
