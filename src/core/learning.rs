//! Learning events, policy updates and agent objectives.
//!
//! Learning events are immutable observations produced by outcome analysis.
//! A policy update is a candidate only; `deployed_at` is set by an external
//! approval step through [`PolicyUpdate::approve`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::decision::{Constraint, Objective};
use crate::error::{CognitionError, Result};

/// Category of a learning event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningEventType {
    PatternDiscovered,
    BiasDetected,
    ObjectiveCalibrated,
    ConstraintLearned,
    PolicyUpdated,
}

impl LearningEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningEventType::PatternDiscovered => "pattern_discovered",
            LearningEventType::BiasDetected => "bias_detected",
            LearningEventType::ObjectiveCalibrated => "objective_calibrated",
            LearningEventType::ConstraintLearned => "constraint_learned",
            LearningEventType::PolicyUpdated => "policy_updated",
        }
    }
}

/// How widely a learning applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    /// Only to the agent and context it was observed in.
    #[default]
    Specific,
    /// To the agent across contexts.
    General,
    /// To every agent.
    Universal,
}

/// Systematic decision biases the engine detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    Overconfidence,
    LossAversion,
    Anchoring,
}

impl BiasKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasKind::Overconfidence => "overconfidence",
            BiasKind::LossAversion => "loss_aversion",
            BiasKind::Anchoring => "anchoring",
        }
    }
}

/// Which estimate a calibration adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationKind {
    Probability,
    Upside,
}

/// Structured payload of a learning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum LearningDetail {
    Pattern {
        /// Machine-readable pattern key, e.g. `action:email`.
        key: String,
        /// Share of successful decisions exhibiting the pattern.
        share: f64,
    },
    Bias {
        kind: BiasKind,
        /// Observed rate that crossed the detection threshold.
        rate: f64,
    },
    Calibration {
        kind: CalibrationKind,
        /// Multiplier to apply to future estimates (< 1 discounts).
        factor: f64,
    },
    Note,
}

/// An immutable, timestamped learning observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: LearningEventType,
    pub agent_id: Option<String>,
    pub description: String,
    pub confidence: f64,
    pub applicability: Applicability,
    pub detail: LearningDetail,
    /// Number of decisions the event was derived from.
    pub sample_size: usize,
    pub created_at: DateTime<Utc>,
}

impl LearningEvent {
    /// Create a new event with a fresh id. Confidence is clamped to [0, 1].
    pub fn new(
        event_type: LearningEventType,
        description: impl Into<String>,
        confidence: f64,
        detail: LearningDetail,
        sample_size: usize,
    ) -> Self {
        Self {
            id: format!("le_{}", uuid::Uuid::new_v4().simple()),
            event_type,
            agent_id: None,
            description: description.into(),
            confidence: crate::core::signal::clamp_unit(confidence),
            applicability: Applicability::Specific,
            detail,
            sample_size,
            created_at: Utc::now(),
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    /// The bias this event reports, if it is a bias event.
    pub fn bias(&self) -> Option<BiasKind> {
        match self.detail {
            LearningDetail::Bias { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// The three policy validation checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCheck {
    NoContradiction,
    HasConstraints,
    ReasonableLength,
}

impl std::fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationCheck::NoContradiction => write!(f, "no_contradiction"),
            ValidationCheck::HasConstraints => write!(f, "has_constraints"),
            ValidationCheck::ReasonableLength => write!(f, "reasonable_length"),
        }
    }
}

/// Result of one validation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub check: ValidationCheck,
    pub passed: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn pass(check: ValidationCheck, message: impl Into<String>) -> Self {
        Self {
            check,
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(check: ValidationCheck, message: impl Into<String>) -> Self {
        Self {
            check,
            passed: false,
            message: message.into(),
        }
    }
}

/// A candidate textual policy delta awaiting operator approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdate {
    pub id: String,
    pub agent_id: String,
    pub previous_policy: String,
    pub new_policy: String,
    pub triggering_events: Vec<LearningEvent>,
    pub validation_results: Vec<ValidationResult>,
    pub created_at: DateTime<Utc>,
    deployed_at: Option<DateTime<Utc>>,
}

impl PolicyUpdate {
    pub fn new(
        agent_id: impl Into<String>,
        previous_policy: impl Into<String>,
        new_policy: impl Into<String>,
        triggering_events: Vec<LearningEvent>,
        validation_results: Vec<ValidationResult>,
    ) -> Self {
        Self {
            id: format!("pu_{}", uuid::Uuid::new_v4().simple()),
            agent_id: agent_id.into(),
            previous_policy: previous_policy.into(),
            new_policy: new_policy.into(),
            triggering_events,
            validation_results,
            created_at: Utc::now(),
            deployed_at: None,
        }
    }

    /// Whether every validation check passed.
    pub fn is_valid(&self) -> bool {
        self.validation_results.iter().all(|r| r.passed)
    }

    pub fn failed_checks(&self) -> Vec<&ValidationResult> {
        self.validation_results.iter().filter(|r| !r.passed).collect()
    }

    pub fn deployed_at(&self) -> Option<DateTime<Utc>> {
        self.deployed_at
    }

    pub fn is_deployed(&self) -> bool {
        self.deployed_at.is_some()
    }

    /// Record operator approval. Fails if already deployed.
    pub fn approve(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.deployed_at.is_some() {
            return Err(CognitionError::already_deployed(&self.id));
        }
        self.deployed_at = Some(at);
        Ok(())
    }
}

/// A calibration applied to an agent's objectives, traced to its event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveCalibration {
    pub kind: CalibrationKind,
    pub factor: f64,
    pub source_event: String,
    pub applied_at: DateTime<Utc>,
}

/// The objectives and constraints governing one agent's decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentObjective {
    pub agent_id: String,
    pub organization_id: String,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub calibrations: Vec<ObjectiveCalibration>,
    pub updated_at: DateTime<Utc>,
}

impl AgentObjective {
    pub fn new(agent_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            organization_id: organization_id.into(),
            objectives: Vec::new(),
            constraints: Vec::new(),
            calibrations: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_objectives(mut self, objectives: Vec<Objective>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<Constraint>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Product of all recorded calibration factors of a kind.
    pub fn calibration_factor(&self, kind: CalibrationKind) -> f64 {
        self.calibrations
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.factor)
            .product()
    }
}
