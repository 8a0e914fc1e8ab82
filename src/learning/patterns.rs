//! Pattern discovery over successful decisions.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::LearningConfig;
use crate::core::{
    Applicability, LearningDetail, LearningEvent, LearningEventType, Reversibility, RiskLevel,
};
use crate::learning::{share, Evaluated};

pub const LOW_RISK_PATTERN: &str = "low_risk";
pub const FULL_REVERSIBILITY_PATTERN: &str = "full_reversibility";

/// Confidence shared by every pattern found in one batch.
///
/// Unweighted average of sample-size confidence, success rate, and
/// `1 - average regret`.
pub fn pattern_confidence(evaluated: &[Evaluated<'_>], config: &LearningConfig) -> f64 {
    if evaluated.is_empty() {
        return 0.0;
    }

    let n = evaluated.len();
    let sample = (n as f64 / config.confidence_saturation.max(1) as f64).min(1.0);
    let successes = evaluated.iter().filter(|e| e.outcome.success).count();
    let success_rate = share(successes, n);
    let avg_regret = evaluated.iter().map(|e| e.outcome.regret).sum::<f64>() / n as f64;
    let quality = (1.0 - avg_regret).clamp(0.0, 1.0);

    (sample + success_rate + quality) / 3.0
}

/// Find recurring traits of successful decisions.
///
/// Needs at least `min_pattern_sample` successes.
pub fn discover_patterns(evaluated: &[Evaluated<'_>], config: &LearningConfig) -> Vec<LearningEvent> {
    let successes: Vec<_> = evaluated.iter().filter(|e| e.outcome.success).collect();
    if successes.len() < config.min_pattern_sample {
        debug!(
            "Skipping pattern discovery: {} successes, need {}",
            successes.len(),
            config.min_pattern_sample
        );
        return Vec::new();
    }

    let total = successes.len();
    let confidence = pattern_confidence(evaluated, config);
    let sample_size = evaluated.len();
    let mut events = Vec::new();

    let mut prefixes: BTreeMap<String, usize> = BTreeMap::new();
    for success in &successes {
        if let Some(prefix) = success.record.selected_option().action_prefix() {
            *prefixes.entry(prefix).or_insert(0) += 1;
        }
    }

    for (prefix, count) in prefixes {
        let prefix_share = share(count, total);
        if prefix_share >= config.pattern_prefix_share {
            events.push(LearningEvent::new(
                LearningEventType::PatternDiscovered,
                format!(
                    "Actions starting with '{}' succeed often ({:.0}% of successful decisions)",
                    prefix,
                    prefix_share * 100.0
                ),
                confidence,
                LearningDetail::Pattern {
                    key: format!("action:{}", prefix),
                    share: prefix_share,
                },
                sample_size,
            ));
        }
    }

    let low_risk = successes
        .iter()
        .filter(|e| e.record.context().risk_assessment.overall_risk == RiskLevel::Low)
        .count();
    let low_risk_share = share(low_risk, total);
    if low_risk_share > config.low_risk_share {
        events.push(
            LearningEvent::new(
                LearningEventType::PatternDiscovered,
                format!(
                    "Low-risk decisions dominate successes ({:.0}%)",
                    low_risk_share * 100.0
                ),
                confidence,
                LearningDetail::Pattern {
                    key: LOW_RISK_PATTERN.to_string(),
                    share: low_risk_share,
                },
                sample_size,
            )
            .with_applicability(Applicability::General),
        );
    }

    let reversible = successes
        .iter()
        .filter(|e| e.record.selected_option().reversibility == Reversibility::Full)
        .count();
    let reversible_share = share(reversible, total);
    if reversible_share > config.full_reversibility_share {
        events.push(
            LearningEvent::new(
                LearningEventType::PatternDiscovered,
                format!(
                    "Fully reversible options dominate successes ({:.0}%)",
                    reversible_share * 100.0
                ),
                confidence,
                LearningDetail::Pattern {
                    key: FULL_REVERSIBILITY_PATTERN.to_string(),
                    share: reversible_share,
                },
                sample_size,
            )
            .with_applicability(Applicability::General),
        );
    }

    events
}
