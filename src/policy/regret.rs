//! Regret against counterfactual outcomes.

use tracing::debug;

use crate::core::DecisionRecord;

/// Regret of a decision: how far the best alternative beat the actual value.
///
/// `max(0, best_counterfactual - actual)`. No counterfactuals, or none that
/// beat the actual value, means zero regret. NaN estimates are ignored.
pub fn calculate_regret(decision: &DecisionRecord, actual: f64, counterfactuals: &[f64]) -> f64 {
    let best = counterfactuals
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))));

    // f64::max maps a NaN difference to 0
    let regret = best.map_or(0.0, |best| (best - actual).max(0.0));

    debug!(
        "Regret for {}: {:.3} over {} counterfactuals",
        decision.id(),
        regret,
        counterfactuals.len()
    );
    regret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AutonomyLevel, DecisionContext, DecisionOption};

    fn make_decision() -> DecisionRecord {
        DecisionRecord::new(
            "d1",
            "agent",
            "org",
            DecisionContext::default(),
            DecisionOption::new("o", "ship", 0.5),
            AutonomyLevel::Advisory,
            "",
        )
    }

    #[test]
    fn test_regret_is_gap_to_best() {
        assert_eq!(calculate_regret(&make_decision(), 10.0, &[4.0, 15.0, 12.0]), 5.0);
    }

    #[test]
    fn test_outperforming_has_no_regret() {
        assert_eq!(calculate_regret(&make_decision(), 20.0, &[4.0, 15.0]), 0.0);
    }

    #[test]
    fn test_empty_counterfactuals() {
        assert_eq!(calculate_regret(&make_decision(), -5.0, &[]), 0.0);
    }

    #[test]
    fn test_nan_estimates_ignored() {
        assert_eq!(calculate_regret(&make_decision(), 1.0, &[f64::NAN, 3.0]), 2.0);
        assert_eq!(calculate_regret(&make_decision(), 1.0, &[f64::NAN]), 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: regret is never negative
            #[test]
            fn prop_regret_non_negative(
                actual in proptest::num::f64::ANY,
                counterfactuals in proptest::collection::vec(proptest::num::f64::ANY, 0..10),
            ) {
                let regret = calculate_regret(&make_decision(), actual, &counterfactuals);
                prop_assert!(regret >= 0.0);
            }
        }
    }
}
