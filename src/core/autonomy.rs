//! Autonomy levels and per-agent trust scores.
//!
//! A [`TrustScore`] exists for each (agent, organization) pair. Its current
//! autonomy level is never above its ceiling; any write that would break this
//! is rejected rather than clamped. Only the governor moves the level.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CognitionError, Result};

/// How independently an agent may act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum AutonomyLevel {
    /// Suggests only; a human approves every action.
    #[default]
    Advisory = 0,
    /// Prepares actions; a human approves and reviews.
    ApprovalRequired = 1,
    /// Executes, then a human reviews.
    ExecuteAndReview = 2,
    /// Executes within bounds without review.
    AutonomousBounded = 3,
    /// May rewrite its own policy.
    SelfModifying = 4,
}

impl AutonomyLevel {
    /// Highest level on the scale.
    pub const MAX: AutonomyLevel = AutonomyLevel::SelfModifying;

    /// Get all levels in ascending order.
    pub fn all() -> &'static [AutonomyLevel] {
        &[
            AutonomyLevel::Advisory,
            AutonomyLevel::ApprovalRequired,
            AutonomyLevel::ExecuteAndReview,
            AutonomyLevel::AutonomousBounded,
            AutonomyLevel::SelfModifying,
        ]
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            AutonomyLevel::Advisory => "Advisory",
            AutonomyLevel::ApprovalRequired => "Approval Required",
            AutonomyLevel::ExecuteAndReview => "Execute + Review",
            AutonomyLevel::AutonomousBounded => "Autonomous (Bounded)",
            AutonomyLevel::SelfModifying => "Self-Modifying",
        }
    }

    pub fn requires_approval(&self) -> bool {
        matches!(
            self,
            AutonomyLevel::Advisory | AutonomyLevel::ApprovalRequired
        )
    }

    pub fn requires_review(&self) -> bool {
        matches!(
            self,
            AutonomyLevel::ApprovalRequired | AutonomyLevel::ExecuteAndReview
        )
    }

    pub fn is_self_modifying(&self) -> bool {
        matches!(self, AutonomyLevel::SelfModifying)
    }

    /// Whether actions may run without prior human approval.
    pub fn can_execute_unsupervised(&self) -> bool {
        !self.requires_approval()
    }

    /// The next level up, if any.
    pub fn next(&self) -> Option<AutonomyLevel> {
        AutonomyLevel::try_from(self.as_u8() + 1).ok()
    }

    /// The next level down, saturating at Advisory.
    pub fn previous(&self) -> AutonomyLevel {
        AutonomyLevel::try_from(self.as_u8().saturating_sub(1)).unwrap_or_default()
    }
}

impl TryFrom<u8> for AutonomyLevel {
    type Error = CognitionError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AutonomyLevel::Advisory),
            1 => Ok(AutonomyLevel::ApprovalRequired),
            2 => Ok(AutonomyLevel::ExecuteAndReview),
            3 => Ok(AutonomyLevel::AutonomousBounded),
            4 => Ok(AutonomyLevel::SelfModifying),
            other => Err(CognitionError::invalid_level(other)),
        }
    }
}

impl From<AutonomyLevel> for u8 {
    fn from(level: AutonomyLevel) -> Self {
        level.as_u8()
    }
}

impl std::fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_u8(), self.name())
    }
}

/// Key identifying one trust score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrustKey {
    pub agent_id: String,
    pub organization_id: String,
}

impl TrustKey {
    pub fn new(agent_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            organization_id: organization_id.into(),
        }
    }
}

impl std::fmt::Display for TrustKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.agent_id, self.organization_id)
    }
}

/// One outcome in the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSample {
    pub success: bool,
    pub regret: f64,
}

/// Running success/failure/regret tally bounding an agent's autonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    pub agent_id: String,
    pub organization_id: String,
    current_level: AutonomyLevel,
    max_allowed_level: AutonomyLevel,
    pub success_count: u64,
    pub failure_count: u64,
    pub regret_sum: f64,
    pub last_updated: DateTime<Utc>,
    /// Most recent outcomes, oldest first.
    #[serde(default)]
    recent: VecDeque<OutcomeSample>,
}

impl TrustScore {
    /// Create a fresh score at Advisory with the given ceiling.
    pub fn new(
        agent_id: impl Into<String>,
        organization_id: impl Into<String>,
        max_allowed_level: AutonomyLevel,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            organization_id: organization_id.into(),
            current_level: AutonomyLevel::Advisory,
            max_allowed_level,
            success_count: 0,
            failure_count: 0,
            regret_sum: 0.0,
            last_updated: Utc::now(),
            recent: VecDeque::new(),
        }
    }

    /// Seed a score at a specific level, e.g. when migrating existing agents.
    ///
    /// Rejects a level above the ceiling.
    pub fn with_level(mut self, level: AutonomyLevel) -> Result<Self> {
        self.set_level(level)?;
        Ok(self)
    }

    pub fn key(&self) -> TrustKey {
        TrustKey::new(&self.agent_id, &self.organization_id)
    }

    pub fn current_level(&self) -> AutonomyLevel {
        self.current_level
    }

    pub fn max_allowed_level(&self) -> AutonomyLevel {
        self.max_allowed_level
    }

    pub fn total_outcomes(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Trailing window of outcomes, oldest first.
    pub fn recent(&self) -> &VecDeque<OutcomeSample> {
        &self.recent
    }

    /// Check the ceiling invariant.
    pub fn check_invariant(&self) -> Result<()> {
        if self.current_level > self.max_allowed_level {
            return Err(CognitionError::autonomy_ceiling(
                self.current_level.as_u8(),
                self.max_allowed_level.as_u8(),
            ));
        }
        Ok(())
    }

    /// Change the operator ceiling.
    ///
    /// Lowering the ceiling below the current level demotes to the new
    /// ceiling immediately.
    pub fn set_max_allowed_level(&mut self, ceiling: AutonomyLevel) {
        self.max_allowed_level = ceiling;
        if self.current_level > ceiling {
            tracing::warn!(
                "ceiling for {} lowered to {}, demoting from {}",
                self.key(),
                ceiling,
                self.current_level
            );
            self.current_level = ceiling;
        }
        self.last_updated = Utc::now();
    }

    /// Set the current level, rejecting anything above the ceiling.
    pub(crate) fn set_level(&mut self, level: AutonomyLevel) -> Result<()> {
        if level > self.max_allowed_level {
            return Err(CognitionError::autonomy_ceiling(
                level.as_u8(),
                self.max_allowed_level.as_u8(),
            ));
        }
        self.current_level = level;
        Ok(())
    }

    /// Append a sample to the trailing window, evicting beyond `window_size`.
    pub(crate) fn push_sample(&mut self, sample: OutcomeSample, window_size: usize) {
        self.recent.push_back(sample);
        while self.recent.len() > window_size {
            self.recent.pop_front();
        }
    }

    /// Forget the trailing window, e.g. after a level change.
    pub(crate) fn clear_window(&mut self) {
        self.recent.clear();
    }
}
