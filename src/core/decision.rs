//! Decision vocabulary shared by reasoning, governance and learning.
//!
//! Objectives, constraints and options are produced outside this crate; these
//! types fix their shape. A [`DecisionRecord`] is institutional memory: once an
//! outcome is attached it is never changed again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::autonomy::AutonomyLevel;
use crate::core::signal::StructuredSignal;
use crate::error::{CognitionError, Result};

/// Whether a constraint may be traded off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Hard,
    Soft,
}

/// Where a constraint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSource {
    NorthStar,
    User,
    Learned,
    Regulatory,
}

/// A rule that bounds which options are acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    pub rule: String,
    pub priority: u8,
    pub source: ConstraintSource,
    /// Learning event that produced this constraint, for learned constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_from: Option<String>,
}

impl Constraint {
    /// Create a new constraint.
    pub fn new(
        kind: ConstraintKind,
        rule: impl Into<String>,
        priority: u8,
        source: ConstraintSource,
    ) -> Self {
        Self {
            kind,
            rule: rule.into(),
            priority,
            source,
            learned_from: None,
        }
    }

    /// Create a learned soft constraint traced to a learning event.
    pub fn learned(rule: impl Into<String>, priority: u8, event_id: Option<String>) -> Self {
        Self {
            kind: ConstraintKind::Soft,
            rule: rule.into(),
            priority,
            source: ConstraintSource::Learned,
            learned_from: event_id,
        }
    }
}

/// A target the agent optimizes for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub metric: String,
    pub target: f64,
    pub weight: f64,
    pub time_horizon_days: u32,
}

impl Objective {
    pub fn new(metric: impl Into<String>, target: f64, weight: f64, time_horizon_days: u32) -> Self {
        Self {
            metric: metric.into(),
            target,
            weight,
            time_horizon_days,
        }
    }
}

/// How far an option can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reversibility {
    Full,
    Partial,
    None,
}

/// One candidate action considered by reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: String,
    /// Imperative action text, e.g. "increase ad spend on search".
    pub action: String,
    /// Estimated probability of success in [0, 1].
    pub probability: f64,
    pub upside: f64,
    pub downside: f64,
    pub reversibility: Reversibility,
    pub time_to_result_days: u32,
}

impl DecisionOption {
    pub fn new(id: impl Into<String>, action: impl Into<String>, probability: f64) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            probability,
            upside: 0.0,
            downside: 0.0,
            reversibility: Reversibility::Full,
            time_to_result_days: 0,
        }
    }

    pub fn with_payoff(mut self, upside: f64, downside: f64) -> Self {
        self.upside = upside;
        self.downside = downside;
        self
    }

    pub fn with_reversibility(mut self, reversibility: Reversibility) -> Self {
        self.reversibility = reversibility;
        self
    }

    pub fn with_time_to_result(mut self, days: u32) -> Self {
        self.time_to_result_days = days;
        self
    }

    /// First whitespace-separated word of the action, lowercased.
    pub fn action_prefix(&self) -> Option<String> {
        self.action
            .split_whitespace()
            .next()
            .map(|word| word.to_lowercase())
    }
}

/// Coarse risk rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn is_high_or_critical(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// What a kill trigger does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillAction {
    Pause,
    Stop,
    Revert,
    Escalate,
}

/// A condition/threshold pair that halts execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillTrigger {
    pub condition: String,
    pub threshold: f64,
    pub action: KillAction,
}

/// A named contributor to the overall risk rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub level: RiskLevel,
    pub mitigation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    #[serde(default)]
    pub factors: Vec<RiskFactor>,
    #[serde(default)]
    pub kill_triggers: Vec<KillTrigger>,
}

impl RiskAssessment {
    pub fn new(overall_risk: RiskLevel) -> Self {
        Self {
            overall_risk,
            factors: Vec::new(),
            kill_triggers: Vec::new(),
        }
    }
}

/// Value given up by not choosing an alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityCost {
    pub option_id: String,
    pub description: String,
    pub estimated_cost: f64,
}

/// Everything reasoning considered for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DecisionContext {
    #[serde(default)]
    pub signals: Vec<StructuredSignal>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    /// Options in the order they were presented.
    #[serde(default)]
    pub options: Vec<DecisionOption>,
    #[serde(default)]
    pub risk_assessment: RiskAssessment,
    #[serde(default)]
    pub opportunity_costs: Vec<OpportunityCost>,
}

/// What happened after a decision was executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub success: bool,
    pub actual_value: f64,
    pub expected_value: f64,
    /// Non-negative gap to the best alternative.
    pub regret: f64,
    #[serde(default)]
    pub learnings: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionOutcome {
    pub fn new(success: bool, actual_value: f64, expected_value: f64, regret: f64) -> Self {
        Self {
            success,
            actual_value,
            expected_value,
            regret: regret.max(0.0),
            learnings: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn success(actual_value: f64, expected_value: f64) -> Self {
        Self::new(true, actual_value, expected_value, 0.0)
    }

    pub fn failure(actual_value: f64, expected_value: f64, regret: f64) -> Self {
        Self::new(false, actual_value, expected_value, regret)
    }

    pub fn with_learnings(mut self, learnings: Vec<String>) -> Self {
        self.learnings = learnings;
        self
    }
}

/// Durable record binding a decision to its context and outcome.
///
/// Fields are read through getters. The context and selected option can be
/// amended only until an outcome is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    id: String,
    agent_id: String,
    organization_id: String,
    context: DecisionContext,
    selected_option: DecisionOption,
    autonomy_level: AutonomyLevel,
    reasoning: String,
    created_at: DateTime<Utc>,
    executed_at: Option<DateTime<Utc>>,
    outcome: Option<DecisionOutcome>,
}

impl DecisionRecord {
    /// Create a new record without an outcome.
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        organization_id: impl Into<String>,
        context: DecisionContext,
        selected_option: DecisionOption,
        autonomy_level: AutonomyLevel,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            organization_id: organization_id.into(),
            context,
            selected_option,
            autonomy_level,
            reasoning: reasoning.into(),
            created_at: Utc::now(),
            executed_at: None,
            outcome: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn context(&self) -> &DecisionContext {
        &self.context
    }

    pub fn selected_option(&self) -> &DecisionOption {
        &self.selected_option
    }

    pub fn autonomy_level(&self) -> AutonomyLevel {
        self.autonomy_level
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    /// Mutable access to the context while the decision is still open.
    pub fn context_mut(&mut self) -> Result<&mut DecisionContext> {
        self.ensure_open()?;
        Ok(&mut self.context)
    }

    /// Mutable access to the selected option while the decision is still open.
    pub fn selected_option_mut(&mut self) -> Result<&mut DecisionOption> {
        self.ensure_open()?;
        Ok(&mut self.selected_option)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.outcome.is_some() {
            return Err(CognitionError::outcome_already_recorded(&self.id));
        }
        Ok(())
    }

    /// The outcome, once known.
    pub fn outcome(&self) -> Option<&DecisionOutcome> {
        self.outcome.as_ref()
    }

    pub fn has_outcome(&self) -> bool {
        self.outcome.is_some()
    }

    /// Mark the decision as executed.
    pub fn mark_executed(&mut self, at: DateTime<Utc>) {
        if self.executed_at.is_none() {
            self.executed_at = Some(at);
        }
    }

    /// Attach the outcome. Fails if one is already attached.
    pub fn attach_outcome(&mut self, outcome: DecisionOutcome) -> Result<()> {
        self.ensure_open()?;
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Whether the selected option was the first one presented.
    ///
    /// Returns false when no options were recorded.
    pub fn chose_first_option(&self) -> bool {
        self.context
            .options
            .first()
            .is_some_and(|first| first.id == self.selected_option.id)
    }
}

/// One step of an action plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub description: String,
    pub reversible: bool,
}

/// Execution contract for a selected option. Execution itself is external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub decision_id: String,
    pub steps: Vec<ActionStep>,
    #[serde(default)]
    pub kill_triggers: Vec<KillTrigger>,
    pub rollback_plan: Option<String>,
    pub required_autonomy: AutonomyLevel,
}

impl ActionPlan {
    /// Check the plan against its contract.
    ///
    /// Returns a list of violations; an empty list means the plan is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.steps.is_empty() {
            violations.push("plan has no steps".to_string());
        }

        for (i, step) in self.steps.iter().enumerate() {
            if step.description.trim().is_empty() {
                violations.push(format!("step {} has no description", i + 1));
            }
        }

        for trigger in &self.kill_triggers {
            if !trigger.threshold.is_finite() {
                violations.push(format!(
                    "kill trigger '{}' has a non-finite threshold",
                    trigger.condition
                ));
            }
        }

        let irreversible = self.steps.iter().any(|s| !s.reversible);
        let has_rollback = self
            .rollback_plan
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        if irreversible && !has_rollback {
            violations.push("plan contains irreversible steps but no rollback plan".to_string());
        }

        violations
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
