//! Shared data model for the decision pipeline.
//!
//! This module defines the vocabulary every stage reads and writes: signals,
//! decisions and their outcomes, autonomy levels and trust scores, learning
//! events and policy updates. Enumerated fields are closed enums so that
//! out-of-domain values fail at the boundary.

pub mod autonomy;
pub mod decision;
pub mod learning;
pub mod signal;

pub use autonomy::{AutonomyLevel, OutcomeSample, TrustKey, TrustScore};
pub use decision::{
    ActionPlan, ActionStep, Constraint, ConstraintKind, ConstraintSource, DecisionContext,
    DecisionOption, DecisionOutcome, DecisionRecord, KillAction, KillTrigger, Objective,
    OpportunityCost, Reversibility, RiskAssessment, RiskFactor, RiskLevel,
};
pub use learning::{
    AgentObjective, Applicability, BiasKind, CalibrationKind, LearningDetail, LearningEvent,
    LearningEventType, ObjectiveCalibration, PolicyUpdate, ValidationCheck, ValidationResult,
};
pub use signal::{
    clamp_unit, EntityKind, EntityRef, PerceptionInput, SignalMetadata, SignalSource,
    SignalType, SignalValue, StructuredSignal, GLOBAL_ENTITY_ID,
};
