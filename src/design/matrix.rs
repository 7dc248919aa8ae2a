//! Full-factorial design matrix generation.
//!
//! Rows are the Cartesian product of factor levels in declaration order (last
//! factor varies fastest), expanded per block and per replicate. Run numbers
//! are 1-based and strictly increasing; row ids are `row_<runNumber>`.

use std::collections::BTreeMap;

use crate::domain::{
    DesignMatrix, DesignMatrixRow, Factor, GeneratorConfig, GeneratorKind, Level,
};

const BLOCK_FACTOR_ID: &str = "block";

/// Expansion options for `create_matrix_rows`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOptions {
    pub replicates: usize,
    pub blocks: Vec<Level>,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            replicates: 1,
            blocks: Vec::new(),
        }
    }
}

/// Expand factors into design rows.
///
/// Zero factors yield a single row with no levels; a factor without levels
/// yields no rows at all.
pub fn create_matrix_rows(factors: &[Factor], options: &MatrixOptions) -> Vec<DesignMatrixRow> {
    let blocks: Vec<Option<&Level>> = if options.blocks.is_empty() {
        vec![None]
    } else {
        options.blocks.iter().map(Some).collect()
    };

    let mut rows = Vec::new();
    let mut run_number = 1;
    for combination in cartesian_product(factors) {
        let base: BTreeMap<String, Level> = factors
            .iter()
            .zip(combination)
            .map(|(factor, level)| (factor.id.clone(), level.clone()))
            .collect();

        for block in &blocks {
            for replicate in 0..options.replicates {
                let mut factor_levels = base.clone();
                if let Some(block) = block {
                    factor_levels.insert(BLOCK_FACTOR_ID.to_string(), (*block).clone());
                }
                rows.push(DesignMatrixRow {
                    id: format!("row_{run_number}"),
                    run_number,
                    factor_levels,
                    block: block.cloned(),
                    replicate: (options.replicates > 1).then_some(replicate + 1),
                });
                run_number += 1;
            }
        }
    }
    rows
}

fn cartesian_product(factors: &[Factor]) -> Vec<Vec<&Level>> {
    factors.iter().fold(vec![Vec::new()], |partials, factor| {
        partials
            .iter()
            .flat_map(|partial| {
                factor.levels.iter().map(move |level| {
                    let mut next = partial.clone();
                    next.push(level);
                    next
                })
            })
            .collect()
    })
}

/// Titer levels: explicit `levels`, or a serial dilution series.
///
/// The series is empty when `startValue`, `dilutionFactor` or `count` is
/// missing or zero.
pub fn build_titer_levels(generator: &GeneratorConfig) -> Vec<Level> {
    if !generator.levels.is_empty() {
        return generator.levels.clone();
    }
    let (Some(start), Some(dilution), Some(count)) =
        (generator.start_value, generator.dilution_factor, generator.count)
    else {
        return Vec::new();
    };
    if start == 0.0 || dilution == 0.0 || count == 0 {
        return Vec::new();
    }
    (0..count)
        .map(|i| Level::Number(start / dilution.powi(i as i32)))
        .collect()
}

/// Single-factor serial dilution design.
pub fn generate_titer_matrix(generator: &GeneratorConfig) -> DesignMatrix {
    let factors = vec![Factor {
        id: non_empty(&generator.factor_id).unwrap_or("titer").to_string(),
        name: non_empty(&generator.factor_name).unwrap_or("Titer").to_string(),
        levels: build_titer_levels(generator),
    }];
    let matrix = create_matrix_rows(
        &factors,
        &MatrixOptions {
            replicates: generator.replicate_count(),
            ..MatrixOptions::default()
        },
    );
    DesignMatrix { factors, matrix }
}

/// `generator.factors` plus a `block` factor, unless one is already declared.
pub fn generate_block_matrix(generator: &GeneratorConfig) -> DesignMatrix {
    let mut factors = generator.factors.clone();
    if !factors.iter().any(|f| f.id == BLOCK_FACTOR_ID) {
        factors.push(Factor {
            id: BLOCK_FACTOR_ID.to_string(),
            name: non_empty(&generator.block_name).unwrap_or("Block").to_string(),
            levels: generator.blocks.clone(),
        });
    }
    let matrix = create_matrix_rows(
        &factors,
        &MatrixOptions {
            replicates: generator.replicate_count(),
            ..MatrixOptions::default()
        },
    );
    DesignMatrix { factors, matrix }
}

/// Dispatch on the generator type.
///
/// A missing or unrecognised type falls back to a plain full-factorial
/// expansion of `fallback_factors`.
pub fn generate_design_matrix(generator: &GeneratorConfig, fallback_factors: &[Factor]) -> DesignMatrix {
    match generator.kind {
        Some(GeneratorKind::Titer) => generate_titer_matrix(generator),
        Some(GeneratorKind::Blocks) => generate_block_matrix(generator),
        Some(GeneratorKind::Unknown) | None => DesignMatrix {
            factors: fallback_factors.to_vec(),
            matrix: create_matrix_rows(fallback_factors, &MatrixOptions::default()),
        },
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
