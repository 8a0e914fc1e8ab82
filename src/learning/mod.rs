//! Outcome learning engine.
//!
//! Batch analysis over a snapshot of decision history. Only decisions with an
//! attached outcome are evaluated. The three detectors (patterns, biases,
//! calibration) run independently and their events are concatenated; thin
//! data yields an empty list, never an error.
//!
//! Callers must pass a consistent snapshot (see [`DecisionStore::window`]),
//! not a history that is being appended to mid-analysis.
//!
//! [`DecisionStore::window`]: crate::storage::DecisionStore::window

pub mod biases;
pub mod calibration;
pub mod cycle;
pub mod patterns;

use tracing::info;

use crate::config::LearningConfig;
use crate::core::{DecisionOutcome, DecisionRecord, LearningEvent};

pub use biases::detect_biases;
pub use calibration::{calibrate_objectives, PROBABILITY_CALIBRATION_FACTOR};
pub use cycle::{run_cycle, CycleReport};
pub use patterns::{discover_patterns, pattern_confidence};

/// A decision paired with its outcome.
#[derive(Debug, Clone, Copy)]
pub struct Evaluated<'a> {
    pub record: &'a DecisionRecord,
    pub outcome: &'a DecisionOutcome,
}

/// Decisions that have an outcome, in input order.
pub fn evaluated(decisions: &[DecisionRecord]) -> Vec<Evaluated<'_>> {
    decisions
        .iter()
        .filter_map(|record| {
            record
                .outcome()
                .map(|outcome| Evaluated { record, outcome })
        })
        .collect()
}

/// `count / total`, or 0 for an empty total.
pub(crate) fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Analyze a batch of decisions and return every learning event found.
///
/// When every evaluated decision belongs to the same agent, events are
/// tagged with that agent.
pub fn analyze_outcomes(decisions: &[DecisionRecord], config: &LearningConfig) -> Vec<LearningEvent> {
    let evaluated = evaluated(decisions);

    let mut events = discover_patterns(&evaluated, config);
    events.extend(detect_biases(&evaluated, config));
    events.extend(calibrate_objectives(&evaluated, config));

    if let Some(agent) = single_agent(&evaluated) {
        events = events
            .into_iter()
            .map(|event| event.with_agent(agent))
            .collect();
    }

    for event in &events {
        info!(
            "Learning event {} ({:.2}): {}",
            event.event_type.as_str(),
            event.confidence,
            event.description
        );
    }

    events
}

fn single_agent<'a>(evaluated: &[Evaluated<'a>]) -> Option<&'a str> {
    let first = evaluated.first()?.record.agent_id();
    evaluated
        .iter()
        .all(|e| e.record.agent_id() == first)
        .then_some(first)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::{
        AutonomyLevel, BiasKind, DecisionContext, DecisionOption, LearningEventType,
    };

    /// A low-risk, fully reversible decision where the only option was chosen.
    ///
    /// `outcome`: `Some(true)` clean success, `Some(false)` failure with
    /// regret 0.2, `None` pending.
    pub(crate) fn make_decision(
        id: &str,
        action: &str,
        probability: f64,
        outcome: Option<bool>,
    ) -> DecisionRecord {
        settle(make_open_decision("agent-1", id, action, probability), outcome)
    }

    /// Same shape as [`make_decision`] for any agent, without an outcome.
    pub(crate) fn make_open_decision(
        agent: &str,
        id: &str,
        action: &str,
        probability: f64,
    ) -> DecisionRecord {
        let option = DecisionOption::new(format!("{}-opt", id), action, probability);
        let context = DecisionContext {
            options: vec![option.clone()],
            ..DecisionContext::default()
        };
        DecisionRecord::new(
            id,
            agent,
            "org-1",
            context,
            option,
            AutonomyLevel::ExecuteAndReview,
            "test",
        )
    }

    pub(crate) fn settle(mut record: DecisionRecord, outcome: Option<bool>) -> DecisionRecord {
        match outcome {
            Some(true) => record
                .attach_outcome(DecisionOutcome::success(10.0, 10.0))
                .unwrap(),
            Some(false) => record
                .attach_outcome(DecisionOutcome::failure(0.0, 10.0, 0.2))
                .unwrap(),
            None => {}
        }
        record
    }

    #[test]
    fn test_empty_history_yields_nothing() {
        assert!(analyze_outcomes(&[], &LearningConfig::default()).is_empty());
    }

    #[test]
    fn test_pending_decisions_are_ignored() {
        let decisions: Vec<_> = (0..20)
            .map(|i| make_decision(&format!("d{}", i), "ship", 0.9, None))
            .collect();
        assert!(evaluated(&decisions).is_empty());
        assert!(analyze_outcomes(&decisions, &LearningConfig::default()).is_empty());
    }

    #[test]
    fn test_detectors_are_additive() {
        let mut decisions: Vec<_> = (0..9)
            .map(|i| make_decision(&format!("s{}", i), "ship feature", 0.6, Some(true)))
            .collect();
        decisions.extend((0..3).map(|i| make_decision(&format!("f{}", i), "bet big", 0.95, Some(false))));

        let events = analyze_outcomes(&decisions, &LearningConfig::default());
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert!(types.contains(&LearningEventType::PatternDiscovered));
        assert!(types.contains(&LearningEventType::BiasDetected));
        assert!(types.contains(&LearningEventType::ObjectiveCalibrated));
        assert!(events
            .iter()
            .any(|e| e.bias() == Some(BiasKind::Overconfidence)));
        assert!(events
            .iter()
            .all(|e| e.agent_id.as_deref() == Some("agent-1")));
    }

    #[test]
    fn test_mixed_agents_are_not_tagged() {
        let mut decisions: Vec<_> = (0..3)
            .map(|i| make_decision(&format!("d{}", i), "ship", 0.6, Some(true)))
            .collect();
        decisions[1] = settle(make_open_decision("agent-2", "d1", "ship", 0.6), Some(true));

        let events = analyze_outcomes(&decisions, &LearningConfig::default());
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.agent_id.is_none()));
    }

    #[test]
    fn test_share() {
        assert_eq!(share(0, 0), 0.0);
        assert_eq!(share(1, 4), 0.25);
    }
}
