//! Trust transition rules.
//!
//! A pure function from (score, outcome) to the next score. Demotion is
//! checked first and always wins over promotion:
//!
//! - a failure with regret above `critical_regret` demotes immediately
//! - a trailing-window failure ratio above `demotion_failure_ratio` demotes
//!   once the window holds `min_demotion_samples` outcomes, even before it
//!   is full
//! - promotion needs a full window, a success ratio of at least
//!   `promotion_success_ratio`, average regret below
//!   `promotion_max_avg_regret`, and a next level within the ceiling
//!
//! Any level change clears the window, so the agent has to re-earn trust at
//! the new level from fresh evidence.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GovernorConfig;
use crate::core::{AutonomyLevel, DecisionOutcome, OutcomeSample, TrustScore};
use crate::error::Result;

/// Why an agent lost autonomy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DemotionReason {
    /// A single failure exceeded the critical regret threshold.
    CriticalFailure { regret: f64 },
    /// Too many failures in the trailing window.
    FailureRatio { ratio: f64 },
}

impl fmt::Display for DemotionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemotionReason::CriticalFailure { regret } => {
                write!(f, "critical failure (regret {:.2})", regret)
            }
            DemotionReason::FailureRatio { ratio } => {
                write!(f, "failure ratio {:.0}% over trailing window", ratio * 100.0)
            }
        }
    }
}

/// Result of applying one outcome to a trust score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum TrustTransition {
    Promoted {
        from: AutonomyLevel,
        to: AutonomyLevel,
    },
    Demoted {
        from: AutonomyLevel,
        to: AutonomyLevel,
        reason: DemotionReason,
    },
    Unchanged,
}

impl TrustTransition {
    pub fn is_demotion(&self) -> bool {
        matches!(self, TrustTransition::Demoted { .. })
    }

    pub fn is_promotion(&self) -> bool {
        matches!(self, TrustTransition::Promoted { .. })
    }
}

/// Summary statistics over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub len: usize,
    pub success_ratio: f64,
    pub failure_ratio: f64,
    pub average_regret: f64,
}

impl WindowStats {
    pub fn of(score: &TrustScore) -> Self {
        let recent = score.recent();
        let len = recent.len();
        if len == 0 {
            return Self {
                len,
                success_ratio: 0.0,
                failure_ratio: 0.0,
                average_regret: 0.0,
            };
        }

        let successes = recent.iter().filter(|s| s.success).count();
        let regret: f64 = recent.iter().map(|s| s.regret).sum();
        let n = len as f64;

        Self {
            len,
            success_ratio: successes as f64 / n,
            failure_ratio: (len - successes) as f64 / n,
            average_regret: regret / n,
        }
    }
}

/// Apply one outcome to a score, returning the updated score and what changed.
///
/// The input score is not modified. Fails only if the input already
/// violates its ceiling.
pub fn record_outcome(
    score: &TrustScore,
    outcome: &DecisionOutcome,
    config: &GovernorConfig,
    now: DateTime<Utc>,
) -> Result<(TrustScore, TrustTransition)> {
    score.check_invariant()?;

    let mut next = score.clone();
    let regret = outcome.regret;

    if outcome.success {
        next.success_count += 1;
    } else {
        next.failure_count += 1;
    }
    next.regret_sum += regret;
    next.last_updated = now;
    next.push_sample(
        OutcomeSample {
            success: outcome.success,
            regret,
        },
        config.window_size.max(1),
    );

    let stats = WindowStats::of(&next);
    let from = next.current_level();

    let demotion = if !outcome.success && regret > config.critical_regret {
        Some(DemotionReason::CriticalFailure { regret })
    } else if stats.len >= config.min_demotion_samples.clamp(1, config.window_size.max(1))
        && stats.failure_ratio > config.demotion_failure_ratio
    {
        Some(DemotionReason::FailureRatio {
            ratio: stats.failure_ratio,
        })
    } else {
        None
    };

    if let Some(reason) = demotion {
        if from == AutonomyLevel::Advisory {
            return Ok((next, TrustTransition::Unchanged));
        }
        let to = from.previous();
        next.set_level(to)?;
        next.clear_window();
        return Ok((next, TrustTransition::Demoted { from, to, reason }));
    }

    let window_full = stats.len >= config.window_size;
    let earned = stats.success_ratio >= config.promotion_success_ratio
        && stats.average_regret < config.promotion_max_avg_regret;

    if window_full && earned {
        if let Some(to) = from.next().filter(|to| *to <= next.max_allowed_level()) {
            next.set_level(to)?;
            next.clear_window();
            return Ok((next, TrustTransition::Promoted { from, to }));
        }
    }

    Ok((next, TrustTransition::Unchanged))
}
