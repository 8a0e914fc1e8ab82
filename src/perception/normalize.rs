//! Reshape raw payloads into the typed value for their signal type.
//!
//! Coercion is lenient: numbers may arrive as JSON numbers or numeric
//! strings, and missing fields get neutral defaults.

use serde_json::{Map, Value};

use crate::config::PerceptionConfig;
use crate::core::{SignalType, SignalValue};
use crate::perception::rules::has;

const UNSPECIFIED: &str = "unspecified";

/// Build the typed value for `signal_type` from a raw payload.
pub fn normalize_value(signal_type: SignalType, raw: &Value, config: &PerceptionConfig) -> SignalValue {
    let empty = Map::new();
    let payload = raw.as_object().unwrap_or(&empty);

    match signal_type {
        SignalType::RevenueEvent => SignalValue::Revenue {
            amount: number(payload, &["amount"]).unwrap_or(0.0),
            currency: text(payload, &["currency"])
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| config.default_currency.clone()),
            revenue_type: text(payload, &["type", "event"])
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| "payment".to_string()),
            recurring: flag(payload, "recurring")
                .unwrap_or_else(|| has(payload, "subscription_id") || has(payload, "interval")),
        },
        SignalType::LeadActivity => SignalValue::LeadActivity {
            activity: text(payload, &["activity", "event", "type"])
                .or_else(|| engagement_marker(payload))
                .unwrap_or_else(|| "engagement".to_string()),
            score: number(payload, &["score", "lead_score"]),
        },
        SignalType::ClientSentiment => SignalValue::ClientSentiment {
            sentiment: sentiment(payload),
            feedback: text(payload, &["feedback", "comment"]),
        },
        SignalType::CompetitorAction => SignalValue::CompetitorAction {
            competitor: text(payload, &["competitor", "competitor_id"])
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            action: text(payload, &["action", "event"]).unwrap_or_else(|| UNSPECIFIED.to_string()),
            impact: number(payload, &["impact"]),
        },
        SignalType::FounderState => SignalValue::FounderState {
            energy: number(payload, &["energy"]),
            focus: number(payload, &["focus"]),
            stress: number(payload, &["stress", "burnout"]),
            note: text(payload, &["note"]),
        },
        SignalType::RiskIndicator => SignalValue::RiskIndicator {
            risk: text(payload, &["risk", "alert", "type"]).unwrap_or_else(|| UNSPECIFIED.to_string()),
            severity: number(payload, &["severity", "risk_score", "churn_risk", "risk"])
                .map(|s| s.clamp(0.0, 1.0))
                .unwrap_or(0.5),
            description: text(payload, &["description"]),
        },
        SignalType::OpportunityDetected => SignalValue::Opportunity {
            description: text(payload, &["opportunity", "description"])
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            estimated_value: number(payload, &["estimated_value", "value"]),
        },
        SignalType::MarketChange => SignalValue::MarketChange {
            metric: text(payload, &["metric", "market", "index", "trend"])
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            value: number(payload, &["value"]),
            change_pct: number(payload, &["change_pct", "change"]),
            description: text(payload, &["description"]).or_else(|| free_text(raw)),
        },
    }
}

/// Coerce a JSON value to a finite number.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// First key whose value coerces to a number.
fn number(payload: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(coerce_number))
}

/// First key holding a non-empty string.
fn text(payload: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        payload
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn flag(payload: &Map<String, Value>, key: &str) -> Option<bool> {
    match payload.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

fn engagement_marker(payload: &Map<String, Value>) -> Option<String> {
    ["email_opened", "link_clicked", "replied", "page_view"]
        .iter()
        .find(|key| flag(payload, key).unwrap_or(false))
        .map(|key| key.to_string())
}

/// Sentiment in [-1, 1] from an explicit score, NPS (0-10) or CSAT (1-5).
fn sentiment(payload: &Map<String, Value>) -> f64 {
    let score = number(payload, &["sentiment"])
        .or_else(|| number(payload, &["nps"]).map(|nps| (nps - 5.0) / 5.0))
        .or_else(|| number(payload, &["csat"]).map(|csat| (csat - 3.0) / 2.0))
        .unwrap_or(0.0);
    score.clamp(-1.0, 1.0)
}

/// Text for payloads that are not objects, so nothing is silently lost.
fn free_text(raw: &Value) -> Option<String> {
    match raw {
        Value::Null | Value::Object(_) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> PerceptionConfig {
        PerceptionConfig::default()
    }

    #[test]
    fn test_revenue_defaults_and_coercion() {
        let value = normalize_value(
            SignalType::RevenueEvent,
            &json!({"amount": "49.90", "payment_id": "p"}),
            &config(),
        );
        assert_eq!(
            value,
            SignalValue::Revenue {
                amount: 49.9,
                currency: "USD".to_string(),
                revenue_type: "payment".to_string(),
                recurring: false,
            }
        );
    }

    #[test]
    fn test_revenue_recurring_from_subscription() {
        let value = normalize_value(
            SignalType::RevenueEvent,
            &json!({"amount": 10, "subscription_id": "sub", "currency": "eur", "type": "Renewal"}),
            &config(),
        );
        match value {
            SignalValue::Revenue {
                currency,
                revenue_type,
                recurring,
                ..
            } => {
                assert_eq!(currency, "EUR");
                assert_eq!(revenue_type, "renewal");
                assert!(recurring);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_amount_is_zero() {
        let value = normalize_value(
            SignalType::RevenueEvent,
            &json!({"amount": "lots", "payment_id": "p"}),
            &config(),
        );
        assert!(matches!(value, SignalValue::Revenue { amount, .. } if amount == 0.0));
    }

    #[test]
    fn test_lead_activity_marker() {
        let value = normalize_value(
            SignalType::LeadActivity,
            &json!({"lead_id": "l", "replied": "yes", "lead_score": 72}),
            &config(),
        );
        assert_eq!(
            value,
            SignalValue::LeadActivity {
                activity: "replied".to_string(),
                score: Some(72.0),
            }
        );
    }

    #[test]
    fn test_sentiment_scales() {
        let nps = normalize_value(SignalType::ClientSentiment, &json!({"nps": 10}), &config());
        assert!(matches!(nps, SignalValue::ClientSentiment { sentiment, .. } if sentiment == 1.0));

        let csat = normalize_value(SignalType::ClientSentiment, &json!({"csat": 2}), &config());
        assert!(
            matches!(csat, SignalValue::ClientSentiment { sentiment, .. } if sentiment == -0.5)
        );

        let raw = normalize_value(SignalType::ClientSentiment, &json!({"sentiment": -4}), &config());
        assert!(matches!(raw, SignalValue::ClientSentiment { sentiment, .. } if sentiment == -1.0));
    }

    #[test]
    fn test_risk_severity_clamped() {
        let value = normalize_value(
            SignalType::RiskIndicator,
            &json!({"alert": "chargebacks", "severity": 3}),
            &config(),
        );
        assert_eq!(
            value,
            SignalValue::RiskIndicator {
                risk: "chargebacks".to_string(),
                severity: 1.0,
                description: None,
            }
        );
    }

    #[test]
    fn test_market_change_keeps_free_text() {
        let value = normalize_value(SignalType::MarketChange, &json!("rates rising"), &config());
        assert_eq!(
            value,
            SignalValue::MarketChange {
                metric: "unspecified".to_string(),
                value: None,
                change_pct: None,
                description: Some("rates rising".to_string()),
            }
        );
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(3)), Some(3.0));
        assert_eq!(coerce_number(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&Value::Null), None);
    }
}
