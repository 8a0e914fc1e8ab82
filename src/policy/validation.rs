//! Policy text validation.
//!
//! The contradiction check is a heuristic linter. It pairs lines containing
//! opposing directives ("always X" / "never X", "increase X" / "decrease X")
//! whose objects look alike. It misses rephrased conflicts and can flag lines
//! that only look opposed; treat a pass as "nothing obvious", not as proof of
//! consistency.

use crate::config::PolicyConfig;
use crate::core::{ValidationCheck, ValidationResult};

/// Opposing directive words.
pub const OPPOSITIONS: &[(&str, &str)] = &[("always", "never"), ("increase", "decrease")];

/// Markers that make a policy actionable.
pub const ACTIONABLE_MARKERS: &[&str] = &["CONSTRAINT", "APPLY"];

/// Characters two objects must share, from the start, to count as alike.
const OBJECT_PREFIX_LEN: usize = 4;

/// Run all checks against a candidate policy text.
pub fn validate_policy(text: &str, config: &PolicyConfig) -> Vec<ValidationResult> {
    vec![
        check_contradictions(text),
        check_has_constraints(text),
        check_length(text, config),
    ]
}

pub fn check_contradictions(text: &str) -> ValidationResult {
    match find_contradiction(text) {
        Some((a, b)) => ValidationResult::fail(
            ValidationCheck::NoContradiction,
            format!("possible contradiction between \"{}\" and \"{}\"", a, b),
        ),
        None => ValidationResult::pass(ValidationCheck::NoContradiction, "no opposing directives found"),
    }
}

pub fn check_has_constraints(text: &str) -> ValidationResult {
    if ACTIONABLE_MARKERS.iter().any(|m| text.contains(m)) {
        ValidationResult::pass(ValidationCheck::HasConstraints, "policy contains actionable directives")
    } else {
        ValidationResult::fail(
            ValidationCheck::HasConstraints,
            "policy has no CONSTRAINT or APPLY directive",
        )
    }
}

pub fn check_length(text: &str, config: &PolicyConfig) -> ValidationResult {
    let len = text.chars().count();
    if len < config.max_policy_chars {
        ValidationResult::pass(
            ValidationCheck::ReasonableLength,
            format!("{} of {} characters", len, config.max_policy_chars),
        )
    } else {
        ValidationResult::fail(
            ValidationCheck::ReasonableLength,
            format!(
                "policy is {} characters, limit is {}",
                len, config.max_policy_chars
            ),
        )
    }
}

/// First pair of lines that look like opposing directives.
pub fn find_contradiction(text: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    for (i, a) in lines.iter().enumerate() {
        for b in &lines[i + 1..] {
            if opposed(a, b) || opposed(b, a) {
                return Some((a.to_string(), b.to_string()));
            }
        }
    }
    None
}

fn opposed(a: &str, b: &str) -> bool {
    OPPOSITIONS.iter().any(|(pos, neg)| {
        let objects_a = objects_after(a, pos);
        let objects_b = objects_after(b, neg);
        objects_a
            .iter()
            .any(|x| objects_b.iter().any(|y| alike(x, y)))
    })
}

/// Words directly following each occurrence of `keyword`.
fn objects_after(line: &str, keyword: &str) -> Vec<String> {
    let words: Vec<String> = line
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    words
        .windows(2)
        .filter(|pair| pair[0] == keyword)
        .map(|pair| pair[1].clone())
        .collect()
}

fn alike(a: &str, b: &str) -> bool {
    let n = a.chars().count().min(b.chars().count()).min(OBJECT_PREFIX_LEN);
    n > 0 && a.chars().take(n).eq(b.chars().take(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_never_flagged() {
        let text = "APPLY: always email leads within an hour\nCORRECT: never emailing cold leads";
        let result = check_contradictions(text);
        assert!(!result.passed);
        assert!(result.message.contains("always email"));
    }

    #[test]
    fn test_increase_decrease_flagged_in_any_order() {
        let text = "decrease spending on ads\nsomething else\nincrease spend on search";
        assert!(find_contradiction(text).is_some());
    }

    #[test]
    fn test_unrelated_objects_pass() {
        let text = "always verify invoices\nnever discount renewals\nincrease prices yearly";
        assert!(find_contradiction(text).is_none());
        assert!(check_contradictions(text).passed);
    }

    #[test]
    fn test_same_line_is_not_a_pair() {
        assert!(find_contradiction("always test, never test in prod").is_none());
    }

    #[test]
    fn test_has_constraints() {
        assert!(check_has_constraints("APPLY: x").passed);
        assert!(check_has_constraints("CONSTRAINT: y").passed);
        assert!(!check_has_constraints("CORRECT: z\nCALIBRATE: w").passed);
    }

    #[test]
    fn test_length_limit_is_exclusive() {
        let config = PolicyConfig {
            max_policy_chars: 10,
            ..PolicyConfig::default()
        };
        assert!(check_length("123456789", &config).passed);
        assert!(!check_length("1234567890", &config).passed);
    }

    #[test]
    fn test_validate_runs_all_checks_in_order() {
        let results = validate_policy("APPLY: ship", &PolicyConfig::default());
        let checks: Vec<_> = results.iter().map(|r| r.check).collect();
        assert_eq!(
            checks,
            vec![
                ValidationCheck::NoContradiction,
                ValidationCheck::HasConstraints,
                ValidationCheck::ReasonableLength,
            ]
        );
        assert!(results.iter().all(|r| r.passed));
    }
}
