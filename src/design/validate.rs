//! Structural validation for stored experiment designs.
//!
//! Returns human-readable error strings; an empty list means the design is
//! usable. Row `runNumber` presence is enforced by deserialization.

use crate::domain::ExperimentDesign;

pub fn validate_design(design: &ExperimentDesign) -> Vec<String> {
    let mut errors = Vec::new();

    if design.id.is_empty() {
        errors.push("ExperimentDesign.id is required".to_string());
    }
    if design.name.is_empty() {
        errors.push("ExperimentDesign.name is required".to_string());
    }
    if design.created_by_user_id.as_deref().is_none_or(str::is_empty) {
        errors.push("ExperimentDesign.createdByUserId is required".to_string());
    }
    if design.created_at.is_none() {
        errors.push("ExperimentDesign.createdAt is required".to_string());
    }

    for (index, factor) in design.factors.iter().enumerate() {
        if factor.id.is_empty() {
            errors.push(format!("ExperimentDesign.factors[{index}].id is required"));
        }
        if factor.name.is_empty() {
            errors.push(format!("ExperimentDesign.factors[{index}].name is required"));
        }
        if factor.levels.is_empty() {
            errors.push(format!(
                "ExperimentDesign.factors[{index}].levels must be a non-empty array"
            ));
        }
    }

    let factor_ids: Vec<&str> = design
        .factors
        .iter()
        .map(|f| f.id.as_str())
        .filter(|id| !id.is_empty())
        .collect();

    for (index, row) in design.matrix.iter().enumerate() {
        if row.id.is_empty() {
            errors.push(format!("ExperimentDesign.matrix[{index}].id is required"));
        }
        for factor_id in &factor_ids {
            if !row.factor_levels.contains_key(*factor_id) {
                errors.push(format!(
                    "ExperimentDesign.matrix[{index}].factorLevels missing {factor_id}"
                ));
            }
        }
    }

    errors
}
