//! Storage traits injected into the governor and the learning cycle.

use std::sync::Arc;

use crate::core::{DecisionOutcome, DecisionRecord, TrustKey, TrustScore};
use crate::error::Result;

/// Persistence for trust scores, keyed by (agent, organization).
///
/// Scores are created on first use and never implicitly deleted.
pub trait TrustStore: Send + Sync {
    /// Retrieve a score. Returns `Ok(None)` if the pair has never been seen.
    fn get(&self, key: &TrustKey) -> Result<Option<TrustScore>>;

    /// Save a score, creating or replacing it.
    ///
    /// Implementations must reject scores violating the ceiling invariant.
    fn put(&self, score: &TrustScore) -> Result<()>;

    /// All known scores, ordered by key.
    fn list(&self) -> Result<Vec<TrustScore>>;

    fn exists(&self, key: &TrustKey) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Append-only decision history.
///
/// Records are never deleted or rewritten; the only mutation is attaching
/// an outcome, which happens at most once per decision.
pub trait DecisionStore: Send + Sync {
    /// Append a new decision. Fails if the id is already present.
    fn append(&self, record: &DecisionRecord) -> Result<()>;

    /// Attach the outcome of a decision.
    ///
    /// Fails if the decision is unknown or already has an outcome.
    fn attach_outcome(&self, id: &str, outcome: &DecisionOutcome) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<DecisionRecord>>;

    /// Snapshot of the most recent `limit` decisions, oldest first.
    fn window(&self, limit: usize) -> Result<Vec<DecisionRecord>>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<T: TrustStore + ?Sized> TrustStore for Arc<T> {
    fn get(&self, key: &TrustKey) -> Result<Option<TrustScore>> {
        (**self).get(key)
    }

    fn put(&self, score: &TrustScore) -> Result<()> {
        (**self).put(score)
    }

    fn list(&self) -> Result<Vec<TrustScore>> {
        (**self).list()
    }
}

impl<T: DecisionStore + ?Sized> DecisionStore for Arc<T> {
    fn append(&self, record: &DecisionRecord) -> Result<()> {
        (**self).append(record)
    }

    fn attach_outcome(&self, id: &str, outcome: &DecisionOutcome) -> Result<()> {
        (**self).attach_outcome(id, outcome)
    }

    fn get(&self, id: &str) -> Result<Option<DecisionRecord>> {
        (**self).get(id)
    }

    fn window(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        (**self).window(limit)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}
