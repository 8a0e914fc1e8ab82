//! Cognition - perception, trust governance and outcome learning for
//! decision agents.
//!
//! The crate turns raw business records into structured signals, bounds each
//! agent's autonomy by its track record, learns patterns and biases from
//! decision outcomes, and proposes validated policy updates for an operator
//! to approve. It is a library of mostly pure functions. The only mutable
//! state, trust scores and decision history, lives behind injected stores.

pub mod config;
pub mod core;
pub mod error;
pub mod governor;
pub mod learning;
pub mod perception;
pub mod policy;
pub mod storage;

pub use config::Config;
pub use core::{
    AgentObjective, AutonomyLevel, DecisionOutcome, DecisionRecord, LearningEvent,
    PerceptionInput, PolicyUpdate, SignalType, StructuredSignal, TrustScore,
};
pub use error::{CognitionError, FailOpen, Result};
pub use governor::{Governor, TrustTransition};
pub use learning::{analyze_outcomes, run_cycle, CycleReport};
pub use perception::{filter_signals, prioritize_signals, SignalNormalizer};
pub use policy::{
    apply_bias_correction, apply_calibration, calculate_regret, generate_policy_update,
    BiasCorrection,
};
pub use storage::{
    DecisionStore, JsonlDecisionLog, MemoryDecisionStore, MemoryTrustStore, TrustStore,
};
