//! Policy synthesizer.
//!
//! Produces candidate [`PolicyUpdate`]s from learning events and attaches
//! validation results for an operator to review. Nothing here deploys a
//! policy; approval happens outside via [`PolicyUpdate::approve`].
//!
//! [`PolicyUpdate`]: crate::core::PolicyUpdate
//! [`PolicyUpdate::approve`]: crate::core::PolicyUpdate::approve

pub mod corrections;
pub mod regret;
pub mod synthesis;
pub mod validation;

pub use corrections::{apply_bias_correction, apply_calibration, BiasCorrection};
pub use regret::calculate_regret;
pub use synthesis::{directive_line, directive_tag, generate_policy_update, generate_policy_update_at};
pub use validation::{find_contradiction, validate_policy};
