//! Confidence decay and signal prioritization.
//!
//! Confidence starts from the caller's prior and is multiplied by:
//! - an age factor: older than `expired_after_hours` → `expired_factor`,
//!   else older than `stale_after_hours` → `stale_factor` (only one applies)
//! - an untrusted-source factor for external inputs
//! - an unclassified factor when no classification rule matched
//!
//! Priority score = `confidence_weight × confidence + recency_weight × recency`,
//! where recency = 1 − age/horizon and may go negative for old signals.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::config::PerceptionConfig;
use crate::core::{clamp_unit, SignalSource, StructuredSignal};

/// Age multiplier for an input of the given age.
///
/// Future timestamps (negative age) are not decayed. A threshold too large
/// for a `Duration` is never reached.
pub fn age_factor(age: Duration, config: &PerceptionConfig) -> f64 {
    if age > hours_threshold(config.expired_after_hours) {
        config.expired_factor
    } else if age > hours_threshold(config.stale_after_hours) {
        config.stale_factor
    } else {
        1.0
    }
}

fn hours_threshold(hours: i64) -> Duration {
    Duration::try_hours(hours).unwrap_or(Duration::MAX)
}

/// Compute the final confidence of a perceived signal.
pub fn compute_confidence(
    prior: f64,
    age: Duration,
    source: SignalSource,
    classified: bool,
    config: &PerceptionConfig,
) -> f64 {
    let mut confidence = clamp_unit(prior) * age_factor(age, config);

    if !source.is_trusted() {
        confidence *= config.untrusted_source_factor;
    }
    if !classified {
        confidence *= config.unclassified_factor;
    }

    clamp_unit(confidence)
}

/// Recency of a signal relative to `now`, capped at 1.0 but unbounded below.
pub fn recency_score(signal: &StructuredSignal, now: DateTime<Utc>, config: &PerceptionConfig) -> f64 {
    let age_hours = (now - signal.perceived_at()).num_milliseconds() as f64 / 3_600_000.0;
    (1.0 - age_hours / config.recency_horizon_hours).min(1.0)
}

/// Priority score of a signal.
pub fn priority_score(signal: &StructuredSignal, now: DateTime<Utc>, config: &PerceptionConfig) -> f64 {
    config.confidence_weight * signal.confidence()
        + config.recency_weight * recency_score(signal, now, config)
}

/// A signal with its computed priority.
#[derive(Debug, Clone)]
pub struct ScoredSignal {
    pub signal: StructuredSignal,
    pub score: f64,
}

impl ScoredSignal {
    pub fn new(signal: StructuredSignal, score: f64) -> Self {
        Self { signal, score }
    }
}

/// Rank signals by priority, highest first.
///
/// Ties are broken by signal id so the order is fully deterministic.
pub fn rank_signals(
    signals: &[StructuredSignal],
    now: DateTime<Utc>,
    config: &PerceptionConfig,
) -> Vec<ScoredSignal> {
    let mut scored: Vec<ScoredSignal> = signals
        .iter()
        .map(|s| ScoredSignal::new(s.clone(), priority_score(s, now, config)))
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.signal.id().cmp(b.signal.id()))
    });

    scored
}

/// Rank and return only the signals.
pub fn prioritize_signals(
    signals: &[StructuredSignal],
    now: DateTime<Utc>,
    config: &PerceptionConfig,
) -> Vec<StructuredSignal> {
    rank_signals(signals, now, config)
        .into_iter()
        .map(|s| s.signal)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityRef, SignalMetadata, SignalValue};

    fn config() -> PerceptionConfig {
        PerceptionConfig::default()
    }

    fn make_signal(id: &str, confidence: f64, perceived_at: DateTime<Utc>) -> StructuredSignal {
        StructuredSignal::new(
            id,
            EntityRef::global("org"),
            SignalValue::Opportunity {
                description: "x".to_string(),
                estimated_value: None,
            },
            SignalMetadata {
                source: SignalSource::Internal,
                source_timestamp: perceived_at,
                processing_latency_ms: 0,
                matched_rule: None,
            },
            perceived_at,
            confidence,
        )
    }

    #[test]
    fn test_age_factor_thresholds() {
        let c = config();
        assert_eq!(age_factor(Duration::hours(1), &c), 1.0);
        assert_eq!(age_factor(Duration::hours(24), &c), 1.0);
        assert_eq!(age_factor(Duration::hours(25), &c), 0.8);
        assert_eq!(age_factor(Duration::hours(72), &c), 0.8);
        // Expired replaces stale rather than compounding
        assert_eq!(age_factor(Duration::hours(73), &c), 0.6);
        assert_eq!(age_factor(Duration::hours(-5), &c), 1.0);
    }

    #[test]
    fn test_age_factor_out_of_range_hours() {
        let c = PerceptionConfig {
            stale_after_hours: 10_i64.pow(16),
            expired_after_hours: 10_i64.pow(16),
            ..config()
        };
        assert_eq!(age_factor(Duration::hours(100_000), &c), 1.0);
        assert_eq!(
            compute_confidence(0.9, Duration::hours(100_000), SignalSource::Internal, true, &c),
            0.9
        );
    }

    #[test]
    fn test_compute_confidence_multipliers() {
        let c = config();
        let fresh = compute_confidence(1.0, Duration::zero(), SignalSource::Internal, true, &c);
        assert_eq!(fresh, 1.0);

        let external = compute_confidence(1.0, Duration::zero(), SignalSource::External, true, &c);
        assert!((external - 0.9).abs() < 1e-12);

        let old_external =
            compute_confidence(1.0, Duration::hours(100), SignalSource::External, true, &c);
        assert!((old_external - 0.54).abs() < 1e-12);

        let unclassified =
            compute_confidence(0.8, Duration::zero(), SignalSource::Internal, false, &c);
        assert!((unclassified - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_compute_confidence_clamps_prior() {
        let c = config();
        assert_eq!(
            compute_confidence(4.0, Duration::zero(), SignalSource::Internal, true, &c),
            1.0
        );
        assert_eq!(
            compute_confidence(-1.0, Duration::zero(), SignalSource::Internal, true, &c),
            0.0
        );
        assert_eq!(
            compute_confidence(f64::NAN, Duration::zero(), SignalSource::Internal, true, &c),
            0.0
        );
    }

    #[test]
    fn test_recency_goes_negative_for_stale() {
        let now = Utc::now();
        let old = make_signal("old", 1.0, now - Duration::hours(48));
        assert!((recency_score(&old, now, &config()) + 1.0).abs() < 1e-9);

        let future = make_signal("future", 1.0, now + Duration::hours(5));
        assert_eq!(recency_score(&future, now, &config()), 1.0);
    }

    #[test]
    fn test_prioritize_orders_by_blend() {
        let now = Utc::now();
        let signals = vec![
            make_signal("stale-sure", 0.9, now - Duration::hours(30)),
            make_signal("fresh-unsure", 0.4, now),
            make_signal("fresh-sure", 0.9, now),
        ];

        let ranked = rank_signals(&signals, now, &config());
        let ids: Vec<_> = ranked.iter().map(|s| s.signal.id().to_string()).collect();
        assert_eq!(ids, vec!["fresh-sure", "fresh-unsure", "stale-sure"]);
        assert!((ranked[0].score - (0.6 * 0.9 + 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_by_id() {
        let now = Utc::now();
        let signals = vec![make_signal("b", 0.5, now), make_signal("a", 0.5, now)];
        let ordered = prioritize_signals(&signals, now, &config());
        assert_eq!(ordered[0].id(), "a");
        assert_eq!(ordered[1].id(), "b");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: prioritization is idempotent on sorted output
            #[test]
            fn prop_prioritize_idempotent(
                entries in proptest::collection::vec((0.0f64..=1.0, 0i64..200), 0..20)
            ) {
                let now = Utc::now();
                let signals: Vec<_> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, (conf, hours))| {
                        make_signal(&format!("s{:02}", i), *conf, now - Duration::hours(*hours))
                    })
                    .collect();

                let once = prioritize_signals(&signals, now, &config());
                let twice = prioritize_signals(&once, now, &config());
                let again = prioritize_signals(&signals, now, &config());

                prop_assert_eq!(&once, &twice);
                prop_assert_eq!(&once, &again);
            }

            // Property: confidence always lands in [0, 1]
            #[test]
            fn prop_confidence_in_unit_interval(
                prior in proptest::num::f64::ANY,
                hours in -100i64..500,
                external in any::<bool>(),
                classified in any::<bool>(),
            ) {
                let source = if external { SignalSource::External } else { SignalSource::Internal };
                let c = compute_confidence(prior, Duration::hours(hours), source, classified, &config());
                prop_assert!((0.0..=1.0).contains(&c));
            }
        }
    }
}
