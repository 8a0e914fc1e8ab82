//! Autonomy and trust governor.
//!
//! [`Governor`] owns no scores itself: it reads and writes them through an
//! injected [`TrustStore`]. Updates for the same (agent, organization) pair
//! are serialized with a per-key lock so concurrent outcomes cannot lose
//! each other's increments. Different pairs update in parallel.
//!
//! # Example
//!
//! ```
//! use cognition::config::GovernorConfig;
//! use cognition::core::{AutonomyLevel, DecisionOutcome};
//! use cognition::governor::Governor;
//! use cognition::storage::MemoryTrustStore;
//!
//! let governor = Governor::new(MemoryTrustStore::new(), GovernorConfig::default());
//! let (score, _) = governor
//!     .record_outcome("agent-1", "acme", &DecisionOutcome::success(10.0, 10.0))
//!     .unwrap();
//! assert_eq!(score.current_level(), AutonomyLevel::Advisory);
//! assert!(!governor.permits("agent-1", "acme", AutonomyLevel::ExecuteAndReview).unwrap());
//! ```

pub mod rules;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::GovernorConfig;
use crate::core::{AutonomyLevel, DecisionOutcome, TrustKey, TrustScore};
use crate::error::{CognitionError, Result};
use crate::storage::TrustStore;

pub use rules::{record_outcome, DemotionReason, TrustTransition, WindowStats};

/// Ceiling given to agents seen for the first time.
pub const DEFAULT_CEILING: AutonomyLevel = AutonomyLevel::AutonomousBounded;

/// Trust governor over an injected store.
#[derive(Debug)]
pub struct Governor<S: TrustStore> {
    store: S,
    config: GovernorConfig,
    default_ceiling: AutonomyLevel,
    key_locks: Mutex<HashMap<TrustKey, Arc<Mutex<()>>>>,
}

impl<S: TrustStore> Governor<S> {
    pub fn new(store: S, config: GovernorConfig) -> Self {
        Self {
            store,
            config,
            default_ceiling: DEFAULT_CEILING,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different ceiling for newly created scores.
    pub fn with_default_ceiling(mut self, ceiling: AutonomyLevel) -> Self {
        self.default_ceiling = ceiling;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Record an outcome for an agent, creating its score on first use.
    pub fn record_outcome(
        &self,
        agent_id: &str,
        organization_id: &str,
        outcome: &DecisionOutcome,
    ) -> Result<(TrustScore, TrustTransition)> {
        self.record_outcome_at(agent_id, organization_id, outcome, Utc::now())
    }

    pub fn record_outcome_at(
        &self,
        agent_id: &str,
        organization_id: &str,
        outcome: &DecisionOutcome,
        now: DateTime<Utc>,
    ) -> Result<(TrustScore, TrustTransition)> {
        let key = TrustKey::new(agent_id, organization_id);
        let (next, transition) = self.with_key_lock(&key, || {
            let current = self.load_or_create(&key)?;
            let (next, transition) = record_outcome(&current, outcome, &self.config, now)?;
            self.store.put(&next)?;
            Ok((next, transition))
        })?;

        match transition {
            TrustTransition::Promoted { from, to } => {
                info!("Promoted {} from {} to {}", key, from, to);
            }
            TrustTransition::Demoted { from, to, reason } => {
                warn!("Demoted {} from {} to {}: {}", key, from, to, reason);
            }
            TrustTransition::Unchanged => {
                debug!(
                    "Recorded outcome for {} (success={}, regret={:.3})",
                    key, outcome.success, outcome.regret
                );
            }
        }

        Ok((next, transition))
    }

    /// The stored score, if the pair has been seen.
    pub fn score(&self, agent_id: &str, organization_id: &str) -> Result<Option<TrustScore>> {
        self.store.get(&TrustKey::new(agent_id, organization_id))
    }

    /// Current level, Advisory for unknown agents.
    pub fn current_level(&self, agent_id: &str, organization_id: &str) -> Result<AutonomyLevel> {
        Ok(self
            .score(agent_id, organization_id)?
            .map_or(AutonomyLevel::Advisory, |s| s.current_level()))
    }

    /// Whether the agent may act at `required` autonomy.
    pub fn permits(
        &self,
        agent_id: &str,
        organization_id: &str,
        required: AutonomyLevel,
    ) -> Result<bool> {
        Ok(self.current_level(agent_id, organization_id)? >= required)
    }

    /// Change an agent's operator ceiling.
    ///
    /// Lowering it below the current level demotes immediately.
    pub fn set_ceiling(
        &self,
        agent_id: &str,
        organization_id: &str,
        ceiling: AutonomyLevel,
    ) -> Result<TrustScore> {
        let key = TrustKey::new(agent_id, organization_id);
        let score = self.with_key_lock(&key, || {
            let mut score = self.load_or_create(&key)?;
            score.set_max_allowed_level(ceiling);
            self.store.put(&score)?;
            Ok(score)
        })?;
        info!("Ceiling for {} set to {}", key, ceiling);
        Ok(score)
    }

    fn load_or_create(&self, key: &TrustKey) -> Result<TrustScore> {
        match self.store.get(key)? {
            Some(score) => Ok(score),
            None => {
                debug!("Creating trust score for {}", key);
                Ok(TrustScore::new(
                    &key.agent_id,
                    &key.organization_id,
                    self.default_ceiling,
                ))
            }
        }
    }

    /// Run `f` while holding the pair's lock.
    ///
    /// The lock entry is dropped from the table once no caller holds it, so
    /// the table only tracks pairs with an update in flight.
    fn with_key_lock<T>(&self, key: &TrustKey, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.key_lock(key)?;
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(CognitionError::invalid_state(format!(
                "trust lock poisoned for {}",
                key
            ))),
        };
        drop(lock);
        self.release_key_lock(key);
        result
    }

    fn key_lock(&self, key: &TrustKey) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .key_locks
            .lock()
            .map_err(|_| CognitionError::invalid_state("governor lock table poisoned"))?;
        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }

    // Clones are only handed out under the table lock, so a count of one
    // here means no caller holds or waits on this entry.
    fn release_key_lock(&self, key: &TrustKey) {
        if let Ok(mut locks) = self.key_locks.lock() {
            if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.key_locks.lock().map_or(0, |locks| locks.len())
    }
}
