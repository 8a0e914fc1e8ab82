//! Append-only JSONL decision log.
//!
//! Each line is one entry: either a new decision or the outcome of an
//! earlier one. Lines are never rewritten, so the file is a complete audit
//! trail. Reading replays entries in order; lines that fail to parse are
//! skipped with a warning rather than failing the whole history.
//!
//! The file is replayed once, on first use, into an in-memory index that
//! later calls update as they append. The log assumes it is the only writer
//! of its file; entries appended by another process show up on reopen.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::cognition_home;
use crate::core::{DecisionOutcome, DecisionRecord};
use crate::error::{CognitionError, Result};
use crate::storage::DecisionStore;

/// Schema version written on every line.
pub const DECISION_LOG_SCHEMA_VERSION: u8 = 1;

/// File name used under the cognition home directory.
pub const DECISION_LOG_FILE: &str = "decisions.jsonl";

/// One line of the log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogLine {
    pub v: u8,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: LogEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum LogEntry {
    Decision { record: DecisionRecord },
    Outcome { decision_id: String, outcome: DecisionOutcome },
}

/// Decisions in append order with an id index.
#[derive(Debug, Default)]
struct Replay {
    records: Vec<DecisionRecord>,
    index: HashMap<String, usize>,
}

impl Replay {
    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn get(&self, id: &str) -> Option<&DecisionRecord> {
        self.index.get(id).and_then(|&i| self.records.get(i))
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut DecisionRecord> {
        let i = *self.index.get(id)?;
        self.records.get_mut(i)
    }

    /// Returns false when the id is already present.
    fn push(&mut self, record: DecisionRecord) -> bool {
        if self.contains(record.id()) {
            return false;
        }
        self.index.insert(record.id().to_string(), self.records.len());
        self.records.push(record);
        true
    }
}

/// JSONL-backed [`DecisionStore`].
#[derive(Debug)]
pub struct JsonlDecisionLog {
    path: PathBuf,
    // Serializes check-then-append and holds the replayed history.
    state: Mutex<Option<Replay>>,
}

impl JsonlDecisionLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(None),
        }
    }

    /// Open the log at `~/.cognition/decisions.jsonl` (or under `$COGNITION_HOME`).
    pub fn in_home() -> Result<Self> {
        let home = cognition_home().ok_or_else(|| {
            CognitionError::config("Could not determine cognition home (no home directory)")
        })?;
        Ok(Self::new(home.join(DECISION_LOG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, entry: LogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CognitionError::storage(parent, e))?;
        }

        let line = LogLine {
            v: DECISION_LOG_SCHEMA_VERSION,
            ts: Utc::now(),
            entry,
        };
        let json = serde_json::to_string(&line)
            .map_err(|e| CognitionError::serde(format!("Failed to serialize log entry: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CognitionError::storage(&self.path, e))?;
        writeln!(file, "{}", json).map_err(|e| CognitionError::storage(&self.path, e))?;

        Ok(())
    }

    /// Replay the file into decision records, in append order.
    ///
    /// Always reads from disk; the store operations use the cached replay.
    pub fn read_all(&self) -> Result<Vec<DecisionRecord>> {
        Ok(self.replay()?.records)
    }

    fn replay(&self) -> Result<Replay> {
        let mut replay = Replay::default();
        if !self.path.exists() {
            return Ok(replay);
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| CognitionError::storage(&self.path, e))?;

        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let parsed: LogLine = match serde_json::from_str(line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(
                        "Skipping corrupt line {} in {}: {}",
                        line_num + 1,
                        self.path.display(),
                        e
                    );
                    continue;
                }
            };

            match parsed.entry {
                LogEntry::Decision { record } => {
                    let id = record.id().to_string();
                    if !replay.push(record) {
                        warn!("Ignoring duplicate decision {} on line {}", id, line_num + 1);
                    }
                }
                LogEntry::Outcome {
                    decision_id,
                    outcome,
                } => match replay.get_mut(&decision_id) {
                    Some(record) => {
                        if let Err(e) = record.attach_outcome(outcome) {
                            warn!("Ignoring outcome on line {}: {}", line_num + 1, e);
                        }
                    }
                    None => warn!(
                        "Ignoring outcome for unknown decision {} on line {}",
                        decision_id,
                        line_num + 1
                    ),
                },
            }
        }

        debug!(
            "Replayed {} decisions from {}",
            replay.records.len(),
            self.path.display()
        );
        Ok(replay)
    }

    /// Run `f` against the cached replay, loading it on first use.
    fn with_state<T>(&self, f: impl FnOnce(&mut Replay) -> Result<T>) -> Result<T> {
        let mut guard: MutexGuard<'_, Option<Replay>> = self
            .state
            .lock()
            .map_err(|_| CognitionError::invalid_state("decision log lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(self.replay()?);
        }
        let replay = guard
            .as_mut()
            .ok_or_else(|| CognitionError::invalid_state("decision log not loaded"))?;
        f(replay)
    }
}

impl DecisionStore for JsonlDecisionLog {
    fn append(&self, record: &DecisionRecord) -> Result<()> {
        self.with_state(|replay| {
            if replay.contains(record.id()) {
                return Err(CognitionError::duplicate_decision(record.id()));
            }
            self.append_line(LogEntry::Decision {
                record: record.clone(),
            })?;
            replay.push(record.clone());
            Ok(())
        })
    }

    fn attach_outcome(&self, id: &str, outcome: &DecisionOutcome) -> Result<()> {
        self.with_state(|replay| {
            let record = replay
                .get_mut(id)
                .ok_or_else(|| CognitionError::decision_not_found(id))?;
            if record.has_outcome() {
                return Err(CognitionError::outcome_already_recorded(id));
            }
            self.append_line(LogEntry::Outcome {
                decision_id: id.to_string(),
                outcome: outcome.clone(),
            })?;
            record.attach_outcome(outcome.clone())
        })
    }

    fn get(&self, id: &str) -> Result<Option<DecisionRecord>> {
        self.with_state(|replay| Ok(replay.get(id).cloned()))
    }

    fn window(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        self.with_state(|replay| {
            let start = replay.records.len().saturating_sub(limit);
            Ok(replay.records[start..].to_vec())
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_state(|replay| Ok(replay.records.len()))
    }
}
