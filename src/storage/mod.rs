//! Injected persistence for trust scores and decision history.
//!
//! The governor and the learning cycle take stores as parameters instead
//! of holding global registries.

pub mod jsonl;
pub mod memory;
pub mod traits;

pub use jsonl::{JsonlDecisionLog, DECISION_LOG_FILE};
pub use memory::{MemoryDecisionStore, MemoryTrustStore};
pub use traits::{DecisionStore, TrustStore};
