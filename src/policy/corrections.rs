//! Apply learning events to an agent's objectives.
//!
//! Learned constraints and calibrations are appended with the id of the
//! event that produced them. Loss-aversion correction is the one operation
//! that removes constraints.

use chrono::Utc;
use tracing::{debug, info};

use crate::core::{
    AgentObjective, BiasKind, Constraint, LearningDetail, LearningEvent, ObjectiveCalibration,
};

pub const OVERCONFIDENCE_RULE: &str = "Reduce probability estimates by 15-20%";
pub const ANCHORING_RULE: &str = "Evaluate at least 3 options before any decision";

/// Priority given to constraints learned from bias corrections.
pub const LEARNED_CONSTRAINT_PRIORITY: u8 = 70;

/// Phrases marking a constraint as risk-averse.
const RISK_AVERSE_PHRASES: &[&str] = &["avoid risk", "minimize downside", "minimise downside"];

/// A bias to correct, traced to the event that detected it.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasCorrection {
    pub bias: BiasKind,
    pub source_event_id: Option<String>,
}

impl BiasCorrection {
    pub fn new(bias: BiasKind) -> Self {
        Self {
            bias,
            source_event_id: None,
        }
    }

    /// The correction for a bias event, `None` for other events.
    pub fn from_event(event: &LearningEvent) -> Option<Self> {
        event.bias().map(|bias| Self {
            bias,
            source_event_id: Some(event.id.clone()),
        })
    }
}

/// Return a copy of `objective` with the correction applied.
pub fn apply_bias_correction(objective: &AgentObjective, correction: &BiasCorrection) -> AgentObjective {
    let mut next = objective.clone();

    match correction.bias {
        BiasKind::Overconfidence => {
            append_constraint(&mut next, OVERCONFIDENCE_RULE, correction);
        }
        BiasKind::LossAversion => {
            let before = next.constraints.len();
            next.constraints.retain(|c| !is_risk_averse(&c.rule));
            let removed = before - next.constraints.len();
            if removed > 0 {
                info!(
                    "Removed {} risk-averse constraint(s) for {}",
                    removed, next.agent_id
                );
            }
        }
        BiasKind::Anchoring => {
            append_constraint(&mut next, ANCHORING_RULE, correction);
        }
    }

    next.updated_at = Utc::now();
    next
}

/// Record a calibration event on the objective.
///
/// Returns `None` if the event carries no calibration.
pub fn apply_calibration(objective: &AgentObjective, event: &LearningEvent) -> Option<AgentObjective> {
    let &LearningDetail::Calibration { kind, factor } = &event.detail else {
        return None;
    };

    let mut next = objective.clone();
    let now = Utc::now();
    next.calibrations.push(ObjectiveCalibration {
        kind,
        factor,
        source_event: event.id.clone(),
        applied_at: now,
    });
    next.updated_at = now;
    Some(next)
}

fn append_constraint(objective: &mut AgentObjective, rule: &str, correction: &BiasCorrection) {
    if objective.constraints.iter().any(|c| c.rule == rule) {
        debug!("Constraint already present for {}: {}", objective.agent_id, rule);
        return;
    }
    objective.constraints.push(Constraint::learned(
        rule,
        LEARNED_CONSTRAINT_PRIORITY,
        correction.source_event_id.clone(),
    ));
}

fn is_risk_averse(rule: &str) -> bool {
    let rule = rule.to_lowercase();
    RISK_AVERSE_PHRASES.iter().any(|p| rule.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        CalibrationKind, ConstraintKind, ConstraintSource, LearningEventType,
    };

    fn make_objective() -> AgentObjective {
        AgentObjective::new("agent", "org").with_constraints(vec![
            Constraint::new(ConstraintKind::Hard, "Stay within budget", 100, ConstraintSource::NorthStar),
            Constraint::new(ConstraintKind::Soft, "Always avoid risk", 50, ConstraintSource::User),
            Constraint::new(ConstraintKind::Soft, "Minimize downside exposure", 40, ConstraintSource::User),
        ])
    }

    fn bias_event(kind: BiasKind) -> LearningEvent {
        LearningEvent::new(
            LearningEventType::BiasDetected,
            "bias",
            0.8,
            LearningDetail::Bias { kind, rate: 0.3 },
            10,
        )
    }

    #[test]
    fn test_overconfidence_appends_traced_constraint() {
        let event = bias_event(BiasKind::Overconfidence);
        let correction = BiasCorrection::from_event(&event).unwrap();
        let next = apply_bias_correction(&make_objective(), &correction);

        assert_eq!(next.constraints.len(), 4);
        let learned = next.constraints.last().unwrap();
        assert_eq!(learned.rule, OVERCONFIDENCE_RULE);
        assert_eq!(learned.source, ConstraintSource::Learned);
        assert_eq!(learned.learned_from.as_deref(), Some(event.id.as_str()));
    }

    #[test]
    fn test_overconfidence_is_not_duplicated() {
        let correction = BiasCorrection::new(BiasKind::Overconfidence);
        let once = apply_bias_correction(&make_objective(), &correction);
        let twice = apply_bias_correction(&once, &correction);
        assert_eq!(once.constraints.len(), twice.constraints.len());
    }

    #[test]
    fn test_loss_aversion_removes_risk_averse_constraints() {
        let next = apply_bias_correction(&make_objective(), &BiasCorrection::new(BiasKind::LossAversion));
        let rules: Vec<_> = next.constraints.iter().map(|c| c.rule.as_str()).collect();
        assert_eq!(rules, vec!["Stay within budget"]);
    }

    #[test]
    fn test_anchoring_appends_option_rule() {
        let next = apply_bias_correction(&make_objective(), &BiasCorrection::new(BiasKind::Anchoring));
        assert_eq!(next.constraints.last().unwrap().rule, ANCHORING_RULE);
    }

    #[test]
    fn test_input_objective_unchanged() {
        let objective = make_objective();
        let _ = apply_bias_correction(&objective, &BiasCorrection::new(BiasKind::LossAversion));
        assert_eq!(objective.constraints.len(), 3);
    }

    #[test]
    fn test_from_event_ignores_non_bias() {
        let event = LearningEvent::new(
            LearningEventType::PatternDiscovered,
            "p",
            0.9,
            LearningDetail::Note,
            3,
        );
        assert!(BiasCorrection::from_event(&event).is_none());
    }

    #[test]
    fn test_apply_calibration() {
        let event = LearningEvent::new(
            LearningEventType::ObjectiveCalibrated,
            "calibrate",
            0.85,
            LearningDetail::Calibration {
                kind: CalibrationKind::Probability,
                factor: 0.825,
            },
            12,
        );
        let objective = AgentObjective::new("agent", "org");
        let next = apply_calibration(&objective, &event).unwrap();
        let next = apply_calibration(&next, &event).unwrap();

        assert_eq!(next.calibrations.len(), 2);
        assert_eq!(next.calibrations[0].source_event, event.id);
        assert!((next.calibration_factor(CalibrationKind::Probability) - 0.825 * 0.825).abs() < 1e-12);
        assert_eq!(next.calibration_factor(CalibrationKind::Upside), 1.0);

        assert!(apply_calibration(&objective, &bias_event(BiasKind::Anchoring)).is_none());
    }
}
