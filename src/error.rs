//! Unified error types for the cognition pipeline.
//!
//! Most of the pipeline degrades instead of failing: perception never errors,
//! and learning returns empty results on thin data. Errors exist for the
//! storage layer, configuration, and the one hard safety invariant, the
//! autonomy ceiling. Ceiling violations must never be swallowed.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cognition operations.
#[derive(Error, Debug)]
pub enum CognitionError {
    /// I/O errors from the decision log or config files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML (de)serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Attempt to set an autonomy level above the agent's ceiling.
    #[error("autonomy level {requested} exceeds ceiling {ceiling}")]
    AutonomyCeiling { requested: u8, ceiling: u8 },

    /// A numeric autonomy level outside 0..=4.
    #[error("invalid autonomy level: {value}")]
    InvalidLevel { value: u8 },

    /// Decision record not found in the store.
    #[error("decision not found: {id}")]
    DecisionNotFound { id: String },

    /// A decision with this id was already appended.
    #[error("decision already recorded: {id}")]
    DuplicateDecision { id: String },

    /// The outcome of a decision is immutable once attached.
    #[error("outcome already recorded for decision {id}")]
    OutcomeAlreadyRecorded { id: String },

    /// A policy update was approved twice.
    #[error("policy update already deployed: {id}")]
    AlreadyDeployed { id: String },

    /// Internal state could not be accessed (e.g. poisoned lock).
    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

/// A specialized Result type for cognition operations.
pub type Result<T> = std::result::Result<T, CognitionError>;

impl CognitionError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an autonomy ceiling error.
    pub fn autonomy_ceiling(requested: u8, ceiling: u8) -> Self {
        Self::AutonomyCeiling { requested, ceiling }
    }

    /// Create an invalid level error.
    pub fn invalid_level(value: u8) -> Self {
        Self::InvalidLevel { value }
    }

    /// Create a decision not found error.
    pub fn decision_not_found(id: impl Into<String>) -> Self {
        Self::DecisionNotFound { id: id.into() }
    }

    /// Create a duplicate decision error.
    pub fn duplicate_decision(id: impl Into<String>) -> Self {
        Self::DuplicateDecision { id: id.into() }
    }

    /// Create an outcome already recorded error.
    pub fn outcome_already_recorded(id: impl Into<String>) -> Self {
        Self::OutcomeAlreadyRecorded { id: id.into() }
    }

    /// Create an already deployed error.
    pub fn already_deployed(id: impl Into<String>) -> Self {
        Self::AlreadyDeployed { id: id.into() }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this error guards a safety invariant.
    ///
    /// Safety violations must be surfaced to the caller and never handled
    /// with [`FailOpen`].
    pub fn is_safety_violation(&self) -> bool {
        matches!(
            self,
            Self::AutonomyCeiling { .. }
                | Self::InvalidLevel { .. }
                | Self::OutcomeAlreadyRecorded { .. }
                | Self::AlreadyDeployed { .. }
        )
    }
}

impl From<io::Error> for CognitionError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CognitionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Logs a warning and substitutes a fallback value. Only use this for
/// infrastructure errors; see [`CognitionError::is_safety_violation`].
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}
