//! Objective calibration from failed decisions.

use tracing::debug;

use crate::config::LearningConfig;
use crate::core::{CalibrationKind, LearningDetail, LearningEvent, LearningEventType};
use crate::learning::Evaluated;

/// Multiplier applied to future probability estimates, the midpoint of a
/// 15-20% reduction.
pub const PROBABILITY_CALIBRATION_FACTOR: f64 = 0.825;

/// Emit calibrations when failed decisions show systematic over-estimation.
///
/// Runs only when the batch contains failures.
pub fn calibrate_objectives(
    evaluated: &[Evaluated<'_>],
    config: &LearningConfig,
) -> Vec<LearningEvent> {
    let failures: Vec<_> = evaluated.iter().filter(|e| !e.outcome.success).collect();
    if failures.is_empty() {
        debug!("Skipping calibration: no failed decisions");
        return Vec::new();
    }

    let n = failures.len() as f64;
    let sample_size = evaluated.len();
    let mut events = Vec::new();

    let avg_probability = failures
        .iter()
        .map(|e| e.record.selected_option().probability)
        .sum::<f64>()
        / n;
    if avg_probability > config.failed_probability_ceiling {
        events.push(LearningEvent::new(
            LearningEventType::ObjectiveCalibrated,
            format!(
                "Reduce probability estimates by 15-20%: failed decisions averaged {:.0}% stated probability",
                avg_probability * 100.0
            ),
            avg_probability,
            LearningDetail::Calibration {
                kind: CalibrationKind::Probability,
                factor: PROBABILITY_CALIBRATION_FACTOR,
            },
            sample_size,
        ));
    }

    let avg_upside = failures
        .iter()
        .map(|e| e.record.selected_option().upside)
        .sum::<f64>()
        / n;
    let avg_actual = failures.iter().map(|e| e.outcome.actual_value).sum::<f64>() / n;
    if avg_upside > 0.0 && avg_upside > config.upside_overshoot * avg_actual {
        let factor = (avg_actual / avg_upside).clamp(0.0, 1.0);
        events.push(LearningEvent::new(
            LearningEventType::ObjectiveCalibrated,
            format!(
                "Discount upside estimates to {:.0}%: failed decisions expected {:.2} but realized {:.2} on average",
                factor * 100.0,
                avg_upside,
                avg_actual
            ),
            1.0 - factor,
            LearningDetail::Calibration {
                kind: CalibrationKind::Upside,
                factor,
            },
            sample_size,
        ));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DecisionOutcome, DecisionRecord};
    use crate::learning::evaluated;
    use crate::learning::tests::make_decision;

    fn factor_of(event: &LearningEvent) -> (CalibrationKind, f64) {
        match event.detail {
            LearningDetail::Calibration { kind, factor } => (kind, factor),
            ref other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_no_failures_no_calibration() {
        let decisions: Vec<_> = (0..5)
            .map(|i| make_decision(&format!("d{}", i), "ship", 0.99, Some(true)))
            .collect();
        assert!(calibrate_objectives(&evaluated(&decisions), &LearningConfig::default()).is_empty());
    }

    #[test]
    fn test_probability_calibration() {
        let decisions = vec![
            make_decision("a", "ship", 0.9, Some(false)),
            make_decision("b", "ship", 0.8, Some(false)),
            make_decision("c", "ship", 0.1, Some(true)),
        ];
        let events = calibrate_objectives(&evaluated(&decisions), &LearningConfig::default());
        let probability: Vec<_> = events
            .iter()
            .filter(|e| factor_of(e).0 == CalibrationKind::Probability)
            .collect();
        assert_eq!(probability.len(), 1);
        assert!((probability[0].confidence - 0.85).abs() < 1e-12);
        assert_eq!(factor_of(probability[0]).1, PROBABILITY_CALIBRATION_FACTOR);
    }

    #[test]
    fn test_probability_at_ceiling_is_not_calibrated() {
        let decisions = vec![make_decision("a", "ship", 0.7, Some(false))];
        let events = calibrate_objectives(&evaluated(&decisions), &LearningConfig::default());
        assert!(events
            .iter()
            .all(|e| factor_of(e).0 != CalibrationKind::Probability));
    }

    #[test]
    fn test_upside_discount() {
        let mut decision: DecisionRecord = make_decision("a", "ship", 0.5, None);
        decision.selected_option_mut().unwrap().upside = 100.0;
        decision
            .attach_outcome(DecisionOutcome::failure(20.0, 100.0, 80.0))
            .unwrap();

        let decisions = vec![decision];
        let events = calibrate_objectives(&evaluated(&decisions), &LearningConfig::default());
        assert_eq!(events.len(), 1);
        let (kind, factor) = factor_of(&events[0]);
        assert_eq!(kind, CalibrationKind::Upside);
        assert!((factor - 0.2).abs() < 1e-12);
        assert!((events[0].confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_upside_within_overshoot_is_kept() {
        let mut decision = make_decision("a", "ship", 0.5, None);
        decision.selected_option_mut().unwrap().upside = 14.0;
        decision
            .attach_outcome(DecisionOutcome::failure(10.0, 14.0, 4.0))
            .unwrap();

        let decisions = vec![decision];
        assert!(calibrate_objectives(&evaluated(&decisions), &LearningConfig::default()).is_empty());
    }
}
