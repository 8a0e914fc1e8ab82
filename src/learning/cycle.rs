//! One batch learning pass: snapshot, analyze, synthesize.

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::core::{DecisionRecord, LearningEvent, PolicyUpdate};
use crate::error::Result;
use crate::learning::{analyze_outcomes, evaluated};
use crate::policy::generate_policy_update;
use crate::storage::DecisionStore;

/// What a learning cycle read and produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub agent_id: String,
    /// Decisions of this agent in the snapshot.
    pub decisions: usize,
    /// Of those, decisions with an outcome.
    pub evaluated: usize,
    pub events: Vec<LearningEvent>,
    pub policy_update: Option<PolicyUpdate>,
}

impl CycleReport {
    pub fn has_update(&self) -> bool {
        self.policy_update.is_some()
    }
}

/// Run one learning cycle for an agent.
///
/// Reads a fixed snapshot of the most recent `learning.analysis_window`
/// decisions, keeps the agent's own, and derives events and a candidate
/// policy update from them. The store is only read.
pub fn run_cycle<S: DecisionStore + ?Sized>(
    store: &S,
    agent_id: &str,
    current_policy: &str,
    config: &Config,
) -> Result<CycleReport> {
    let snapshot: Vec<DecisionRecord> = store
        .window(config.learning.analysis_window)?
        .into_iter()
        .filter(|d| d.agent_id() == agent_id)
        .collect();

    let evaluated_count = evaluated(&snapshot).len();
    let events = analyze_outcomes(&snapshot, &config.learning);
    let policy_update = generate_policy_update(agent_id, &events, current_policy, &config.policy);

    info!(
        "Learning cycle for {}: {} decisions, {} evaluated, {} events, update={}",
        agent_id,
        snapshot.len(),
        evaluated_count,
        events.len(),
        policy_update.is_some()
    );

    Ok(CycleReport {
        agent_id: agent_id.to_string(),
        decisions: snapshot.len(),
        evaluated: evaluated_count,
        events,
        policy_update,
    })
}
