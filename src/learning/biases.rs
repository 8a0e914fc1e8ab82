//! Cognitive bias detection.
//!
//! Three independent detectors, each emitting at most one event:
//! - overconfidence: failures despite a stated probability above
//!   `overconfident_probability`, as a share of all evaluated decisions
//! - loss aversion: too few decisions taken at high or critical risk
//! - anchoring: the first listed option chosen almost every time

use tracing::debug;

use crate::config::LearningConfig;
use crate::core::{Applicability, BiasKind, LearningDetail, LearningEvent, LearningEventType};
use crate::learning::{share, Evaluated};

pub const OVERCONFIDENCE_CONFIDENCE: f64 = 0.8;
pub const LOSS_AVERSION_CONFIDENCE: f64 = 0.75;

/// Run all bias detectors. Needs at least `min_bias_sample` decisions.
pub fn detect_biases(evaluated: &[Evaluated<'_>], config: &LearningConfig) -> Vec<LearningEvent> {
    let n = evaluated.len();
    if n < config.min_bias_sample {
        debug!(
            "Skipping bias detection: {} decisions, need {}",
            n, config.min_bias_sample
        );
        return Vec::new();
    }

    [
        overconfidence(evaluated, config),
        loss_aversion(evaluated, config),
        anchoring(evaluated, config),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn bias_event(kind: BiasKind, description: String, confidence: f64, rate: f64, n: usize) -> LearningEvent {
    LearningEvent::new(
        LearningEventType::BiasDetected,
        description,
        confidence,
        LearningDetail::Bias { kind, rate },
        n,
    )
    .with_applicability(Applicability::General)
}

fn overconfidence(evaluated: &[Evaluated<'_>], config: &LearningConfig) -> Option<LearningEvent> {
    let n = evaluated.len();
    let misses = evaluated
        .iter()
        .filter(|e| {
            !e.outcome.success
                && e.record.selected_option().probability > config.overconfident_probability
        })
        .count();
    let rate = share(misses, n);

    (rate > config.overconfidence_rate).then(|| {
        bias_event(
            BiasKind::Overconfidence,
            format!(
                "Overconfidence: {} of {} decisions failed despite a stated probability above {:.0}%",
                misses,
                n,
                config.overconfident_probability * 100.0
            ),
            OVERCONFIDENCE_CONFIDENCE,
            rate,
            n,
        )
    })
}

fn loss_aversion(evaluated: &[Evaluated<'_>], config: &LearningConfig) -> Option<LearningEvent> {
    let n = evaluated.len();
    let bold = evaluated
        .iter()
        .filter(|e| e.record.context().risk_assessment.overall_risk.is_high_or_critical())
        .count();
    let rate = share(bold, n);

    (rate < config.high_risk_floor).then(|| {
        bias_event(
            BiasKind::LossAversion,
            format!(
                "Loss aversion: only {:.0}% of decisions accepted high or critical risk",
                rate * 100.0
            ),
            LOSS_AVERSION_CONFIDENCE,
            rate,
            n,
        )
    })
}

fn anchoring(evaluated: &[Evaluated<'_>], config: &LearningConfig) -> Option<LearningEvent> {
    let n = evaluated.len();
    let first = evaluated
        .iter()
        .filter(|e| e.record.chose_first_option())
        .count();
    let rate = share(first, n);

    (rate > config.anchoring_rate).then(|| {
        bias_event(
            BiasKind::Anchoring,
            format!(
                "Anchoring: the first listed option was chosen in {:.0}% of decisions",
                rate * 100.0
            ),
            rate,
            rate,
            n,
        )
    })
}
