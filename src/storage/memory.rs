//! In-memory stores.
//!
//! Thread-safe implementations over `RwLock`, used by tests and by callers
//! that persist elsewhere.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{DecisionOutcome, DecisionRecord, TrustKey, TrustScore};
use crate::error::{CognitionError, Result};
use crate::storage::{DecisionStore, TrustStore};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| CognitionError::invalid_state("store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| CognitionError::invalid_state("store lock poisoned"))
}

/// In-memory trust score store.
#[derive(Debug, Default)]
pub struct MemoryTrustStore {
    scores: RwLock<BTreeMap<TrustKey, TrustScore>>,
}

impl MemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(read(&self.scores)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(read(&self.scores)?.is_empty())
    }
}

impl TrustStore for MemoryTrustStore {
    fn get(&self, key: &TrustKey) -> Result<Option<TrustScore>> {
        Ok(read(&self.scores)?.get(key).cloned())
    }

    fn put(&self, score: &TrustScore) -> Result<()> {
        score.check_invariant()?;
        write(&self.scores)?.insert(score.key(), score.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<TrustScore>> {
        Ok(read(&self.scores)?.values().cloned().collect())
    }
}

#[derive(Debug, Default)]
struct DecisionLog {
    records: Vec<DecisionRecord>,
    index: HashMap<String, usize>,
}

/// In-memory append-only decision history.
#[derive(Debug, Default)]
pub struct MemoryDecisionStore {
    log: RwLock<DecisionLog>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionStore for MemoryDecisionStore {
    fn append(&self, record: &DecisionRecord) -> Result<()> {
        let mut log = write(&self.log)?;
        if log.index.contains_key(record.id()) {
            return Err(CognitionError::duplicate_decision(record.id()));
        }
        let position = log.records.len();
        log.index.insert(record.id().to_string(), position);
        log.records.push(record.clone());
        Ok(())
    }

    fn attach_outcome(&self, id: &str, outcome: &DecisionOutcome) -> Result<()> {
        let mut log = write(&self.log)?;
        let position = *log
            .index
            .get(id)
            .ok_or_else(|| CognitionError::decision_not_found(id))?;
        log.records[position].attach_outcome(outcome.clone())
    }

    fn get(&self, id: &str) -> Result<Option<DecisionRecord>> {
        let log = read(&self.log)?;
        Ok(log.index.get(id).map(|&i| log.records[i].clone()))
    }

    fn window(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let log = read(&self.log)?;
        let start = log.records.len().saturating_sub(limit);
        Ok(log.records[start..].to_vec())
    }

    fn len(&self) -> Result<usize> {
        Ok(read(&self.log)?.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AutonomyLevel;
    use crate::storage::traits::tests::{
        make_record, test_decision_store_append_only, test_trust_store_roundtrip,
    };
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_memory_trust_store_roundtrip() {
        let store = MemoryTrustStore::new();
        test_trust_store_roundtrip(&store);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_memory_decision_store_append_only() {
        test_decision_store_append_only(&MemoryDecisionStore::new());
    }

    #[test]
    fn test_put_rejects_ceiling_violation() {
        let store = MemoryTrustStore::new();
        let mut score = TrustScore::new("a", "o", AutonomyLevel::SelfModifying)
            .with_level(AutonomyLevel::SelfModifying)
            .unwrap();
        store.put(&score).unwrap();

        // Lowering the ceiling demotes, so the stored score stays valid
        score.set_max_allowed_level(AutonomyLevel::ApprovalRequired);
        store.put(&score).unwrap();
        let loaded = store.get(&score.key()).unwrap().unwrap();
        assert_eq!(loaded.current_level(), AutonomyLevel::ApprovalRequired);
    }

    #[test]
    fn test_rejects_deserialized_violation() {
        let store = MemoryTrustStore::new();
        let mut json = serde_json::to_value(TrustScore::new("a", "o", AutonomyLevel::Advisory)).unwrap();
        json["current_level"] = serde_json::json!(3);
        let forged: TrustScore = serde_json::from_value(json).unwrap();

        assert!(matches!(
            store.put(&forged),
            Err(CognitionError::AutonomyCeiling { requested: 3, ceiling: 0 })
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(MemoryDecisionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.append(&make_record(&format!("d{}", i))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len().unwrap(), 8);
    }
}
