//! Sample-identifier grammar.
//!
//! Plate layouts encode metadata directly in the sample id, e.g.
//! `Std 1.5e2`, `Blank`, `Control [0.10-0.30]`, `Ctrl min=0.1 max=0.3`.
//! This module is the single place that knows how to read those ids.
//!
//! Control ranges are matched against an ordered pattern list; the first
//! pattern that matches wins:
//!
//! 1. `[min-max]` (an en-dash `–` is accepted in place of `-`)
//! 2. `(min-max)` (same separators)
//! 3. `min X max Y`, optionally `min=X max=Y`, case-insensitive
//!
//! Bounds are runs of ASCII digits and dots and must parse as numbers.
//!
//! Roles are case-insensitive substring tests and can overlap
//! (`"Standard control 5"` is both a standard and a control).

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::ControlRange;

static RANGE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"\[(?P<min>[0-9.]+)\s*[-–]\s*(?P<max>[0-9.]+)\]").expect("Invalid bracket range regex"),
        Regex::new(r"\((?P<min>[0-9.]+)\s*[-–]\s*(?P<max>[0-9.]+)\)").expect("Invalid paren range regex"),
        Regex::new(r"(?i)min\s*=?\s*(?P<min>[0-9.]+)\s*max\s*=?\s*(?P<max>[0-9.]+)")
            .expect("Invalid min/max range regex"),
    ]
});

static ENCLOSED_EXPR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[\[(].*?[\])]\s*").expect("Invalid enclosed expression regex"));

static MIN_MAX_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*min\s*=?\s*[0-9.]+\s*max\s*=?\s*[0-9.]+").expect("Invalid min/max expression regex")
});

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[-+]?[0-9]*\.?[0-9]+(?:e[-+]?[0-9]+)?").expect("Invalid number regex"));

/// Role of a well, derived from its sample id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRole {
    Standard,
    Blank,
    Control,
}

impl SampleRole {
    pub fn matches(self, sample_id: &str) -> bool {
        let lower = sample_id.to_lowercase();
        match self {
            SampleRole::Standard => lower.contains("std") || lower.contains("standard"),
            SampleRole::Blank => lower.contains("blank"),
            SampleRole::Control => lower.contains("control"),
        }
    }
}

pub fn is_standard(sample_id: &str) -> bool {
    SampleRole::Standard.matches(sample_id)
}

pub fn is_blank(sample_id: &str) -> bool {
    SampleRole::Blank.matches(sample_id)
}

pub fn is_control(sample_id: &str) -> bool {
    SampleRole::Control.matches(sample_id)
}

/// Parse a declared control range out of a sample id.
pub fn parse_control_range(sample_id: &str) -> Option<ControlRange> {
    let caps = RANGE_PATTERNS.iter().find_map(|re| re.captures(sample_id))?;
    let min = caps.name("min")?.as_str().parse::<f64>().ok()?;
    let max = caps.name("max")?.as_str().parse::<f64>().ok()?;
    Some(ControlRange { min, max })
}

/// Strip range syntax from a control id so `Control [0.1-0.3]` and
/// `Control min=0.1 max=0.3` group under the same label (`Control`).
pub fn normalize_control_label(sample_id: &str) -> String {
    let without_enclosed = ENCLOSED_EXPR.replace_all(sample_id, "");
    let without_min_max = MIN_MAX_EXPR.replace(&without_enclosed, "");
    without_min_max.trim().to_string()
}

/// First numeric literal in the id (signed, optional exponent).
pub fn parse_concentration(sample_id: &str) -> Option<f64> {
    let token = NUMBER_TOKEN.find(sample_id)?;
    let value = token.as_str().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_range_syntaxes() {
        assert_eq!(
            parse_control_range("Control [10-20]"),
            Some(ControlRange { min: 10.0, max: 20.0 })
        );
        assert_eq!(
            parse_control_range("Ctrl (10.5-20.5)"),
            Some(ControlRange { min: 10.5, max: 20.5 })
        );
        assert_eq!(
            parse_control_range("Ctrl min=10 max=20"),
            Some(ControlRange { min: 10.0, max: 20.0 })
        );
        assert_eq!(
            parse_control_range("ctrl MIN 0.1 MAX 0.3"),
            Some(ControlRange { min: 0.1, max: 0.3 })
        );
        assert_eq!(
            parse_control_range("Control [0.1 – 0.3]"),
            Some(ControlRange { min: 0.1, max: 0.3 })
        );
        assert_eq!(parse_control_range("Control"), None);
    }

    #[test]
    fn bracket_pattern_wins_over_min_max() {
        let r = parse_control_range("Ctrl [1-2] min=5 max=6").unwrap();
        assert_eq!(r, ControlRange { min: 1.0, max: 2.0 });
    }

    #[test]
    fn non_numeric_bounds_yield_none() {
        assert_eq!(parse_control_range("Control [1.2.3-4]"), None);
        assert_eq!(parse_control_range("Control [.-4]"), None);
    }

    #[test]
    fn normalize_strips_every_range_syntax() {
        assert_eq!(normalize_control_label("Control [0.1-0.3]"), "Control");
        assert_eq!(normalize_control_label("Control (0.1-0.3)"), "Control");
        assert_eq!(normalize_control_label("Control min=0.1 max=0.3"), "Control");
        assert_eq!(normalize_control_label("  Positive Control  "), "Positive Control");
    }

    #[test]
    fn concentration_tokens() {
        assert_eq!(parse_concentration("Std 1.5e2"), Some(150.0));
        assert_eq!(parse_concentration("Std 10"), Some(10.0));
        assert_eq!(parse_concentration("Std .5"), Some(0.5));
        assert_eq!(parse_concentration("Std -2"), Some(-2.0));
        assert_eq!(parse_concentration("Blank"), None);
        assert_eq!(parse_concentration("Std 1e999"), None);
    }

    #[test]
    fn roles_are_case_insensitive_and_may_overlap() {
        assert!(is_standard("STD 5"));
        assert!(is_standard("Standard A"));
        assert!(is_blank("blank-1"));
        assert!(is_control("Neg CONTROL"));
        assert!(is_standard("Standard control") && is_control("Standard control"));
        assert!(!is_standard("Sample 1"));
    }
}
