//! Configuration loading for the cognition pipeline.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.cognition/config.toml`)
//! 3. User config (`~/.cognition/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. Every threshold the pipeline uses has a
//! default, so a missing or unreadable file never stops the pipeline.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CognitionError, FailOpen, Result};

/// Name of the per-project and per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".cognition";

/// Upper bound for the perception age thresholds (ten years).
pub const MAX_AGE_HOURS: i64 = 87_600;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Signal normalizer configuration.
    pub perception: PerceptionConfig,
    /// Autonomy governor configuration.
    pub governor: GovernorConfig,
    /// Outcome learning engine configuration.
    pub learning: LearningConfig,
    /// Policy synthesizer configuration.
    pub policy: PolicyConfig,
}

/// Signal normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Age in hours after which a signal is considered stale.
    pub stale_after_hours: i64,
    /// Confidence multiplier for stale signals.
    pub stale_factor: f64,
    /// Age in hours after which a signal is considered expired.
    pub expired_after_hours: i64,
    /// Confidence multiplier for expired signals (replaces `stale_factor`).
    pub expired_factor: f64,
    /// Confidence multiplier for untrusted sources.
    pub untrusted_source_factor: f64,
    /// Confidence multiplier for inputs no classification rule matched.
    pub unclassified_factor: f64,
    /// Weight of confidence in the prioritization score.
    pub confidence_weight: f64,
    /// Weight of recency in the prioritization score.
    pub recency_weight: f64,
    /// Horizon in hours over which recency falls from 1 to 0.
    pub recency_horizon_hours: f64,
    /// Currency assumed when a revenue payload has none.
    pub default_currency: String,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: 24,
            stale_factor: 0.8,
            expired_after_hours: 72,
            expired_factor: 0.6,
            untrusted_source_factor: 0.9,
            unclassified_factor: 0.5,
            confidence_weight: 0.6,
            recency_weight: 0.4,
            recency_horizon_hours: 24.0,
            default_currency: "USD".to_string(),
        }
    }
}

/// Autonomy governor configuration.
///
/// Promotion needs a fully populated window; ratio demotion needs only
/// `min_demotion_samples` outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GovernorConfig {
    /// Number of trailing outcomes the promotion/demotion rules look at.
    pub window_size: usize,
    /// Minimum success ratio over the window to promote.
    pub promotion_success_ratio: f64,
    /// Average regret over the window must be below this to promote.
    pub promotion_max_avg_regret: f64,
    /// Failure ratio over the window above which the agent is demoted.
    pub demotion_failure_ratio: f64,
    /// Regret above which a single failure demotes immediately.
    pub critical_regret: f64,
    /// Outcomes the window must hold before the failure ratio can demote.
    pub min_demotion_samples: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            promotion_success_ratio: 0.9,
            promotion_max_avg_regret: 0.1,
            demotion_failure_ratio: 0.3,
            critical_regret: 0.5,
            min_demotion_samples: 5,
        }
    }
}

/// Outcome learning engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LearningConfig {
    /// Successful decisions needed before pattern discovery runs.
    pub min_pattern_sample: usize,
    /// Decisions needed before bias detection runs.
    pub min_bias_sample: usize,
    /// Share of successes an action prefix needs to count as a pattern.
    pub pattern_prefix_share: f64,
    /// Share of successes that must be low risk for the low-risk pattern.
    pub low_risk_share: f64,
    /// Share of successes that must be fully reversible for the reversibility pattern.
    pub full_reversibility_share: f64,
    /// Sample size at which sample-size confidence saturates.
    pub confidence_saturation: usize,
    /// Stated probability above which a failure counts as overconfident.
    pub overconfident_probability: f64,
    /// Share of overconfident failures above which overconfidence is flagged.
    pub overconfidence_rate: f64,
    /// Share of high/critical risk decisions below which loss aversion is flagged.
    pub high_risk_floor: f64,
    /// Share of first-option picks above which anchoring is flagged.
    pub anchoring_rate: f64,
    /// Average failed-decision probability above which estimates are recalibrated.
    pub failed_probability_ceiling: f64,
    /// Ratio of stated upside to realized value that triggers upside discounting.
    pub upside_overshoot: f64,
    /// Most recent decisions a learning cycle reads from the store.
    pub analysis_window: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_pattern_sample: 3,
            min_bias_sample: 10,
            pattern_prefix_share: 0.5,
            low_risk_share: 0.7,
            full_reversibility_share: 0.6,
            confidence_saturation: 50,
            overconfident_probability: 0.8,
            overconfidence_rate: 0.2,
            high_risk_floor: 0.1,
            anchoring_rate: 0.9,
            failed_probability_ceiling: 0.7,
            upside_overshoot: 1.5,
            analysis_window: 500,
        }
    }
}

/// Policy synthesizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Events at or below this confidence never produce directives.
    pub min_event_confidence: f64,
    /// New policy text must stay under this many characters.
    pub max_policy_chars: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_event_confidence: 0.7,
            max_policy_chars: 10_000,
        }
    }
}

/// Check that a value is a finite ratio in [0.0, 1.0].
fn is_ratio(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

impl Config {
    /// Load configuration with full precedence chain from the current directory.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => Self::layered(None),
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        Self::layered(Some(cwd))
    }

    fn layered(cwd: Option<&Path>) -> Self {
        let mut table = toml::Table::new();

        if let Some(user) = cognition_home().map(|h| h.join("config.toml")) {
            if let Some(layer) = read_table(&user) {
                merge_layer(&mut table, layer, &user);
            }
        }

        if let Some(cwd) = cwd {
            let project = cwd.join(CONFIG_DIR_NAME).join("config.toml");
            if let Some(layer) = read_table(&project) {
                merge_layer(&mut table, layer, &project);
            }
        }

        let mut config = toml::from_str::<Config>(&table.to_string())
            .map_err(|e| CognitionError::config(e.to_string()))
            .fail_open_default("Config layers did not deserialize");

        config.apply_env_overrides();

        config
            .validate()
            .map(|()| config)
            .fail_open_default("Invalid configuration")
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| CognitionError::storage(path, e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| CognitionError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate ranges of every threshold.
    pub fn validate(&self) -> Result<()> {
        let p = &self.perception;
        for (name, value) in [
            ("perception.stale_factor", p.stale_factor),
            ("perception.expired_factor", p.expired_factor),
            ("perception.untrusted_source_factor", p.untrusted_source_factor),
            ("perception.unclassified_factor", p.unclassified_factor),
            ("perception.confidence_weight", p.confidence_weight),
            ("perception.recency_weight", p.recency_weight),
            ("governor.promotion_success_ratio", self.governor.promotion_success_ratio),
            ("governor.demotion_failure_ratio", self.governor.demotion_failure_ratio),
            ("learning.pattern_prefix_share", self.learning.pattern_prefix_share),
            ("learning.low_risk_share", self.learning.low_risk_share),
            (
                "learning.full_reversibility_share",
                self.learning.full_reversibility_share,
            ),
            (
                "learning.overconfident_probability",
                self.learning.overconfident_probability,
            ),
            ("learning.overconfidence_rate", self.learning.overconfidence_rate),
            ("learning.high_risk_floor", self.learning.high_risk_floor),
            ("learning.anchoring_rate", self.learning.anchoring_rate),
            (
                "learning.failed_probability_ceiling",
                self.learning.failed_probability_ceiling,
            ),
            ("policy.min_event_confidence", self.policy.min_event_confidence),
        ] {
            if !is_ratio(value) {
                return Err(CognitionError::config(format!(
                    "{} must be in [0.0, 1.0], got {}",
                    name, value
                )));
            }
        }

        for (name, hours) in [
            ("perception.stale_after_hours", p.stale_after_hours),
            ("perception.expired_after_hours", p.expired_after_hours),
        ] {
            if !(1..=MAX_AGE_HOURS).contains(&hours) {
                return Err(CognitionError::config(format!(
                    "{} must be in [1, {}], got {}",
                    name, MAX_AGE_HOURS, hours
                )));
            }
        }
        if p.expired_after_hours < p.stale_after_hours {
            return Err(CognitionError::config(
                "perception.expired_after_hours must be >= stale_after_hours",
            ));
        }
        if !(p.recency_horizon_hours.is_finite() && p.recency_horizon_hours > 0.0) {
            return Err(CognitionError::config(
                "perception.recency_horizon_hours must be positive",
            ));
        }
        if self.governor.window_size == 0 {
            return Err(CognitionError::config("governor.window_size must be >= 1"));
        }
        if !(self.governor.critical_regret.is_finite() && self.governor.critical_regret >= 0.0) {
            return Err(CognitionError::config(
                "governor.critical_regret must be a non-negative number",
            ));
        }
        if !(self.governor.promotion_max_avg_regret.is_finite()
            && self.governor.promotion_max_avg_regret >= 0.0)
        {
            return Err(CognitionError::config(
                "governor.promotion_max_avg_regret must be a non-negative number",
            ));
        }
        if self.governor.min_demotion_samples == 0 {
            return Err(CognitionError::config(
                "governor.min_demotion_samples must be >= 1",
            ));
        }
        if !(self.learning.upside_overshoot.is_finite() && self.learning.upside_overshoot > 0.0) {
            return Err(CognitionError::config(
                "learning.upside_overshoot must be a positive number",
            ));
        }
        if self.learning.confidence_saturation == 0 {
            return Err(CognitionError::config(
                "learning.confidence_saturation must be >= 1",
            ));
        }
        if self.learning.analysis_window == 0 {
            return Err(CognitionError::config("learning.analysis_window must be >= 1"));
        }
        if self.policy.max_policy_chars == 0 {
            return Err(CognitionError::config("policy.max_policy_chars must be >= 1"));
        }

        Ok(())
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        override_from_env("COGNITION_WINDOW_SIZE", &mut self.governor.window_size);
        override_from_env(
            "COGNITION_PROMOTION_SUCCESS_RATIO",
            &mut self.governor.promotion_success_ratio,
        );
        override_from_env(
            "COGNITION_DEMOTION_FAILURE_RATIO",
            &mut self.governor.demotion_failure_ratio,
        );
        override_from_env("COGNITION_CRITICAL_REGRET", &mut self.governor.critical_regret);
        override_from_env(
            "COGNITION_MIN_EVENT_CONFIDENCE",
            &mut self.policy.min_event_confidence,
        );
        override_from_env("COGNITION_MAX_POLICY_CHARS", &mut self.policy.max_policy_chars);
        override_from_env(
            "COGNITION_DEFAULT_CURRENCY",
            &mut self.perception.default_currency,
        );
    }

    /// Save configuration to the project config file.
    ///
    /// Writes to `.cognition/config.toml` in the given directory via a temp
    /// file and rename.
    pub fn save_project(&self, cwd: &Path) -> Result<()> {
        let dir = cwd.join(CONFIG_DIR_NAME);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| CognitionError::storage(&dir, e))?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| CognitionError::config(e.to_string()))?;

        let temp_path = dir.join(".config.toml.tmp");
        let config_path = dir.join("config.toml");
        fs::write(&temp_path, &content).map_err(|e| CognitionError::storage(&temp_path, e))?;
        fs::rename(&temp_path, &config_path)
            .map_err(|e| CognitionError::storage(&config_path, e))?;

        Ok(())
    }
}

/// Parse an environment variable into `target`, warning and keeping the
/// current value when it does not parse.
fn override_from_env<T>(key: &str, target: &mut T)
where
    T: std::str::FromStr + std::fmt::Display,
{
    let Ok(raw) = env::var(key) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(
            "Invalid {} value '{}'. Using current value '{}'.",
            key,
            raw,
            target
        ),
    }
}

fn read_table(path: &Path) -> Option<toml::Table> {
    let content = fs::read_to_string(path).ok()?;
    match content.parse::<toml::Table>() {
        Ok(table) => Some(table),
        Err(e) => {
            tracing::warn!("ignoring unreadable config {}: {}", path.display(), e);
            None
        }
    }
}

/// Merge one config file into `base` a field at a time.
///
/// A field whose value does not deserialize is skipped with a warning, so
/// the rest of the layer still applies.
fn merge_layer(base: &mut toml::Table, layer: toml::Table, path: &Path) {
    for (key, value) in layer {
        let fields: Vec<(Option<String>, toml::Value)> = match value {
            toml::Value::Table(section) => {
                section.into_iter().map(|(f, v)| (Some(f), v)).collect()
            }
            other => vec![(None, other)],
        };

        for (field, value) in fields {
            let mut incoming = toml::Table::new();
            match &field {
                Some(field) => {
                    let mut section = toml::Table::new();
                    section.insert(field.clone(), value);
                    incoming.insert(key.clone(), toml::Value::Table(section));
                }
                None => {
                    incoming.insert(key.clone(), value);
                }
            }

            let mut candidate = base.clone();
            merge_tables(&mut candidate, incoming);
            match toml::from_str::<Config>(&candidate.to_string()) {
                Ok(_) => *base = candidate,
                Err(e) => tracing::warn!(
                    "ignoring {}{} in {}: {}",
                    key,
                    field.map(|f| format!(".{}", f)).unwrap_or_default(),
                    path.display(),
                    e
                ),
            }
        }
    }
}

/// Deep-merge `other` into `base`; keys in `other` win.
fn merge_tables(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Get the cognition home directory.
///
/// Checks `COGNITION_HOME` first, then falls back to `~/.cognition`.
pub fn cognition_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("COGNITION_HOME") {
        if home.is_empty() {
            tracing::warn!("COGNITION_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }

    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}
