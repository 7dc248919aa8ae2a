//! Shared analysis workflows used by the CLI commands.
//!
//! Each workflow resolves references in the store (failing with `NotFound`
//! when a run or design is missing) and then runs the analysis, which itself
//! never fails on data-quality problems.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::{build_control_summary, build_standard_curve_summary, calculate_factor_effects};
use crate::domain::{
    ColumnSpec, ControlFlag, ControlStatus, FactorEffectSummary, FitConfig, StandardCurveSummary,
};
use crate::error::AppError;
use crate::io::source::ExportReader;
use crate::io::store::ExperimentStore;

/// Everything reported for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub controls: Vec<ControlStatus>,
    pub warnings: Vec<ControlFlag>,
    pub standard_curve: StandardCurveSummary,
    /// Present when the run was executed against a known design.
    pub factor_effects: Option<FactorEffectSummary>,
}

/// Controls, standard curve and (if the run has a design) factor effects.
pub async fn run_summary<R: ExportReader>(
    store: &ExperimentStore,
    reader: &R,
    run_id: &str,
    columns: &ColumnSpec,
    config: &FitConfig,
) -> Result<RunReport, AppError> {
    let run = store.run(run_id)?;

    let (controls, standard_curve) = tokio::join!(
        build_control_summary(store, reader, run_id, columns),
        build_standard_curve_summary(store, reader, run_id, columns, config),
    );

    let design = run
        .design_id
        .as_deref()
        .and_then(|id| store.experiment_designs.iter().find(|d| d.id == id));
    let factor_effects = match design {
        Some(design) => {
            let series = run.run_series_id.as_deref().unwrap_or_default();
            calculate_factor_effects(store, reader, design, series, columns).await
        }
        None => None,
    };

    Ok(RunReport {
        run_id: run.id.clone(),
        controls: controls.controls,
        warnings: controls.warnings,
        standard_curve,
        factor_effects,
    })
}

/// Factor effects for an explicit design and series.
pub async fn run_effects<R: ExportReader>(
    store: &ExperimentStore,
    reader: &R,
    design_id: &str,
    run_series_id: &str,
    columns: &ColumnSpec,
) -> Result<FactorEffectSummary, AppError> {
    let design = store.design(design_id)?;
    calculate_factor_effects(store, reader, design, run_series_id, columns)
        .await
        .ok_or_else(|| AppError::Config("Run series id must not be empty.".to_string()))
}

/// Storage root for relative `dataPath`s: explicit value, else the store file's directory.
pub fn resolve_storage_root(explicit: Option<PathBuf>, store_path: &Path) -> PathBuf {
    explicit.unwrap_or_else(|| match store_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    })
}
