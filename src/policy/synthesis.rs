//! Turn learning events into a candidate policy update.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::PolicyConfig;
use crate::core::{LearningEvent, LearningEventType, PolicyUpdate};
use crate::policy::validation::validate_policy;

/// Directive prefix for an event type, `None` for types that never become
/// directives.
pub fn directive_tag(event_type: LearningEventType) -> Option<&'static str> {
    match event_type {
        LearningEventType::PatternDiscovered => Some("APPLY"),
        LearningEventType::BiasDetected => Some("CORRECT"),
        LearningEventType::ObjectiveCalibrated => Some("CALIBRATE"),
        LearningEventType::ConstraintLearned => Some("CONSTRAINT"),
        LearningEventType::PolicyUpdated => None,
    }
}

/// Render one directive line.
pub fn directive_line(event: &LearningEvent) -> Option<String> {
    directive_tag(event.event_type).map(|tag| format!("{}: {}", tag, event.description))
}

/// Build a policy update from the events confident enough to act on.
///
/// Returns `None` when no event qualifies.
pub fn generate_policy_update(
    agent_id: &str,
    events: &[LearningEvent],
    current_policy: &str,
    config: &PolicyConfig,
) -> Option<PolicyUpdate> {
    generate_policy_update_at(agent_id, events, current_policy, config, Utc::now())
}

pub fn generate_policy_update_at(
    agent_id: &str,
    events: &[LearningEvent],
    current_policy: &str,
    config: &PolicyConfig,
    now: DateTime<Utc>,
) -> Option<PolicyUpdate> {
    let qualifying: Vec<(&LearningEvent, String)> = events
        .iter()
        .filter(|e| e.confidence > config.min_event_confidence)
        .filter_map(|e| directive_line(e).map(|line| (e, line)))
        .collect();

    if qualifying.is_empty() {
        debug!(
            "No policy update for {}: none of {} events above confidence {}",
            agent_id,
            events.len(),
            config.min_event_confidence
        );
        return None;
    }

    let mut new_policy = current_policy.to_string();
    if !new_policy.is_empty() && !new_policy.ends_with('\n') {
        new_policy.push('\n');
    }
    if !new_policy.is_empty() {
        new_policy.push('\n');
    }
    new_policy.push_str(&format!("## Learned {}\n", now.to_rfc3339()));
    for (_, line) in &qualifying {
        new_policy.push_str(line);
        new_policy.push('\n');
    }

    let validation_results = validate_policy(&new_policy, config);
    for failed in validation_results.iter().filter(|r| !r.passed) {
        warn!(
            "Policy update for {} failed {}: {}",
            agent_id, failed.check, failed.message
        );
    }

    let triggering_events = qualifying.into_iter().map(|(e, _)| e.clone()).collect();
    let update = PolicyUpdate::new(
        agent_id,
        current_policy,
        new_policy,
        triggering_events,
        validation_results,
    );
    info!(
        "Generated policy update {} for {} ({} directives, valid={})",
        update.id,
        agent_id,
        update.triggering_events.len(),
        update.is_valid()
    );

    Some(update)
}
