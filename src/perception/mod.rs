//! Signal normalizer: raw heterogeneous records in, structured signals out.
//!
//! Perception never fails. Input no rule recognizes becomes a low-confidence
//! signal of the default type, attributed to the global entity when no id is
//! present.

pub mod normalize;
pub mod priority;
pub mod rules;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::PerceptionConfig;
use crate::core::{PerceptionInput, SignalMetadata, SignalType, StructuredSignal};

pub use normalize::{coerce_number, normalize_value};
pub use priority::{
    age_factor, compute_confidence, prioritize_signals, rank_signals, recency_score, ScoredSignal,
};
pub use rules::{classify, extract_entity, ClassificationRule, CLASSIFICATION_RULES, DEFAULT_SIGNAL_TYPE};

/// Turns [`PerceptionInput`]s into [`StructuredSignal`]s.
#[derive(Debug, Clone, Default)]
pub struct SignalNormalizer {
    config: PerceptionConfig,
}

impl SignalNormalizer {
    pub fn new(config: PerceptionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Perceive one input at the current time.
    pub fn perceive(&self, input: &PerceptionInput) -> StructuredSignal {
        self.perceive_at(input, Utc::now())
    }

    /// Perceive one input as of `now`.
    ///
    /// Every call yields a new signal with a fresh id, even for identical input.
    pub fn perceive_at(&self, input: &PerceptionInput, now: DateTime<Utc>) -> StructuredSignal {
        let rule = classify(&input.raw_data);
        let signal_type = rule.map_or(DEFAULT_SIGNAL_TYPE, |r| r.signal_type);

        if rule.is_none() {
            debug!(
                source = ?input.source,
                default_type = %signal_type,
                "No classification rule matched; using default type"
            );
        }

        let age = now - input.timestamp;
        let confidence = compute_confidence(
            input.confidence,
            age,
            input.source,
            rule.is_some(),
            &self.config,
        );

        let metadata = SignalMetadata {
            source: input.source,
            source_timestamp: input.timestamp,
            processing_latency_ms: age.num_milliseconds().max(0),
            matched_rule: rule.map(|r| r.name.to_string()),
        };

        StructuredSignal::new(
            format!("sig_{}", Uuid::new_v4().simple()),
            extract_entity(&input.raw_data),
            normalize_value(signal_type, &input.raw_data, &self.config),
            metadata,
            now,
            confidence,
        )
    }

    /// Perceive every input, preserving order.
    pub fn perceive_batch(&self, inputs: &[PerceptionInput]) -> Vec<StructuredSignal> {
        self.perceive_batch_at(inputs, Utc::now())
    }

    pub fn perceive_batch_at(
        &self,
        inputs: &[PerceptionInput],
        now: DateTime<Utc>,
    ) -> Vec<StructuredSignal> {
        inputs.iter().map(|input| self.perceive_at(input, now)).collect()
    }

    /// Rank signals by priority as of the current time.
    pub fn prioritize(&self, signals: &[StructuredSignal]) -> Vec<StructuredSignal> {
        prioritize_signals(signals, Utc::now(), &self.config)
    }
}

/// Keep only signals whose type is in `types`, preserving order.
///
/// An empty type list selects nothing.
pub fn filter_signals(signals: &[StructuredSignal], types: &[SignalType]) -> Vec<StructuredSignal> {
    signals
        .iter()
        .filter(|s| types.contains(&s.signal_type()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityKind, SignalSource, SignalValue};
    use chrono::Duration;
    use serde_json::{json, Value};

    fn make_input(raw: Value, age_hours: i64, now: DateTime<Utc>) -> PerceptionInput {
        PerceptionInput::new(
            SignalSource::Integration,
            raw,
            now - Duration::hours(age_hours),
            1.0,
        )
    }

    #[test]
    fn test_perceive_payment() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::default();
        let signal = normalizer.perceive_at(
            &make_input(
                json!({"amount": 250, "payment_id": "pi_9", "client_id": "c-1", "organization_id": "acme"}),
                1,
                now,
            ),
            now,
        );

        assert!(signal.id().starts_with("sig_"));
        assert_eq!(signal.signal_type(), SignalType::RevenueEvent);
        assert_eq!(signal.entity().kind, EntityKind::Client);
        assert_eq!(signal.entity().organization_id, "acme");
        assert_eq!(signal.confidence(), 1.0);
        assert_eq!(signal.perceived_at(), now);
        assert_eq!(signal.metadata().matched_rule.as_deref(), Some("payment_amount"));
        assert_eq!(signal.metadata().processing_latency_ms, 3_600_000);
        assert!(matches!(signal.value(), SignalValue::Revenue { amount, .. } if *amount == 250.0));
    }

    #[test]
    fn test_perceive_with_huge_age_thresholds() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::new(PerceptionConfig {
            stale_after_hours: 10_i64.pow(16),
            expired_after_hours: 10_i64.pow(16),
            ..PerceptionConfig::default()
        });
        let input = make_input(json!({"amount": 40, "payment_id": "pi_2"}), 500, now);
        let signal = normalizer.perceive_at(&input, now);

        assert_eq!(signal.signal_type(), SignalType::RevenueEvent);
        assert_eq!(signal.confidence(), 1.0);
    }

    #[test]
    fn test_perceive_unclassified_degrades() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::default();
        let signal = normalizer.perceive_at(&make_input(json!({"foo": "bar"}), 0, now), now);

        assert_eq!(signal.signal_type(), DEFAULT_SIGNAL_TYPE);
        assert!(signal.entity().is_global());
        assert!(signal.metadata().matched_rule.is_none());
        assert!((signal.confidence() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_perceive_non_object_payload() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::default();
        for raw in [Value::Null, json!(17), json!("interest rates up"), json!([1, 2])] {
            let signal = normalizer.perceive_at(&make_input(raw, 0, now), now);
            assert_eq!(signal.signal_type(), SignalType::MarketChange);
            assert!((0.0..=1.0).contains(&signal.confidence()));
        }
    }

    #[test]
    fn test_future_timestamp_has_zero_latency() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::default();
        let signal = normalizer.perceive_at(&make_input(json!({"trend": "up"}), -2, now), now);
        assert_eq!(signal.metadata().processing_latency_ms, 0);
        assert_eq!(signal.confidence(), 1.0);
    }

    #[test]
    fn test_reperceive_yields_new_signal() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::default();
        let input = make_input(json!({"trend": "up"}), 0, now);
        let a = normalizer.perceive_at(&input, now);
        let b = normalizer.perceive_at(&input, now);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.value(), b.value());
    }

    #[test]
    fn test_perceive_batch_preserves_order() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::default();
        let inputs = vec![
            make_input(json!({"trend": "up"}), 0, now),
            make_input(json!({"lead_id": "l"}), 0, now),
        ];
        let signals = normalizer.perceive_batch_at(&inputs, now);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].signal_type(), SignalType::MarketChange);
        assert_eq!(signals[1].signal_type(), SignalType::LeadActivity);
        assert!(normalizer.perceive_batch(&[]).is_empty());
    }

    #[test]
    fn test_filter_signals() {
        let now = Utc::now();
        let normalizer = SignalNormalizer::default();
        let signals = normalizer.perceive_batch_at(
            &[
                make_input(json!({"trend": "up"}), 0, now),
                make_input(json!({"lead_id": "l"}), 0, now),
                make_input(json!({"nps": 3}), 0, now),
            ],
            now,
        );

        let leads = filter_signals(&signals, &[SignalType::LeadActivity]);
        assert_eq!(leads.len(), 1);

        let both = filter_signals(
            &signals,
            &[SignalType::ClientSentiment, SignalType::MarketChange],
        );
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].signal_type(), SignalType::MarketChange);

        assert!(filter_signals(&signals, &[]).is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_source() -> impl Strategy<Value = SignalSource> {
            prop_oneof![
                Just(SignalSource::Internal),
                Just(SignalSource::Integration),
                Just(SignalSource::Webhook),
                Just(SignalSource::Manual),
                Just(SignalSource::External),
            ]
        }

        fn arb_payload() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<f64>().prop_map(|n| json!(n)),
                "[a-z ]{0,20}".prop_map(Value::String),
                Just(json!({"amount": "12", "invoice_id": "i"})),
                Just(json!({"lead_id": "l", "replied": true})),
                Just(json!({"sentiment": 9})),
                Just(json!({"unknown": {"nested": [1, 2]}})),
            ]
        }

        proptest! {
            // Property: perceived confidence is always within [0, 1]
            #[test]
            fn prop_perceive_confidence_bounded(
                source in arb_source(),
                raw in arb_payload(),
                prior in proptest::num::f64::ANY,
                age_hours in -1000i64..1000,
            ) {
                let now = Utc::now();
                let input = PerceptionInput::new(source, raw, now - Duration::hours(age_hours), prior);
                let signal = SignalNormalizer::default().perceive_at(&input, now);
                prop_assert!((0.0..=1.0).contains(&signal.confidence()));
            }

            // Property: expired inputs keep at most 0.6 of a fresh input's confidence
            #[test]
            fn prop_expired_decays_by_single_factor(
                source in arb_source(),
                raw in arb_payload(),
                prior in 0.0f64..=1.0,
                fresh_hours in 0i64..=24,
                old_hours in 73i64..10_000,
            ) {
                let now = Utc::now();
                let normalizer = SignalNormalizer::default();
                let fresh = PerceptionInput::new(source, raw.clone(), now - Duration::hours(fresh_hours), prior);
                let old = PerceptionInput::new(source, raw, now - Duration::hours(old_hours), prior);

                let fresh_conf = normalizer.perceive_at(&fresh, now).confidence();
                let old_conf = normalizer.perceive_at(&old, now).confidence();

                prop_assert!(old_conf <= fresh_conf);
                prop_assert!((old_conf - fresh_conf * 0.6).abs() < 1e-9);
            }
        }
    }
}
