//! Factor main effects across a run series.
//!
//! Each run is reduced to one response (mean OD over its exports) and linked
//! to its design row. For every factor level the mean response of the runs at
//! that level is compared against the overall mean.

use std::collections::HashMap;

use futures::future::join_all;

use crate::analysis::aggregate::load_exports;
use crate::domain::{
    ColumnSpec, DesignMatrixRow, ExperimentDesign, FactorEffect, FactorEffectSummary, LevelEffect,
};
use crate::io::source::{ExportIndex, ExportReader, RunCatalog};
use crate::math::mean;

/// Mean OD over every numeric row of every readable export of a run.
pub async fn calculate_run_response<I, R>(index: &I, reader: &R, run_id: &str, columns: &ColumnSpec) -> Option<f64>
where
    I: ExportIndex + ?Sized,
    R: ExportReader,
{
    let records = load_exports(index, reader, run_id).await;
    let values: Vec<f64> = records
        .iter()
        .flat_map(|record| record.rows.iter())
        .filter_map(|row| columns.od(row))
        .collect();
    mean(&values)
}

/// Per-factor, per-level effects for the runs of a series.
///
/// Returns `None` without a series id. Runs whose design row is unknown or
/// whose exports hold no readings do not contribute.
pub async fn calculate_factor_effects<S, R>(
    source: &S,
    reader: &R,
    design: &ExperimentDesign,
    run_series_id: &str,
    columns: &ColumnSpec,
) -> Option<FactorEffectSummary>
where
    S: ExportIndex + RunCatalog + ?Sized,
    R: ExportReader,
{
    if run_series_id.is_empty() {
        return None;
    }

    let rows: HashMap<&str, &DesignMatrixRow> = design.matrix.iter().map(|row| (row.id.as_str(), row)).collect();
    let runs = source.series_runs(run_series_id, &design.id);

    let matched: Vec<(&str, &DesignMatrixRow)> = runs
        .iter()
        .filter_map(|run| {
            let row = rows.get(run.design_row_id.as_deref()?)?;
            Some((run.id.as_str(), *row))
        })
        .collect();

    let responses = join_all(matched.iter().map(|&(run_id, row)| async move {
        calculate_run_response(source, reader, run_id, columns)
            .await
            .map(|response| (response, row))
    }))
    .await;

    let responses: Vec<(f64, &DesignMatrixRow)> = responses.into_iter().flatten().collect();
    Some(summarize_effects(design, &responses))
}

/// Main effects from `(response, design row)` pairs.
pub fn summarize_effects(design: &ExperimentDesign, responses: &[(f64, &DesignMatrixRow)]) -> FactorEffectSummary {
    let all: Vec<f64> = responses.iter().map(|(response, _)| *response).collect();
    let Some(overall_mean) = mean(&all) else {
        return FactorEffectSummary::default();
    };

    let factors = design
        .factors
        .iter()
        .map(|factor| FactorEffect {
            id: factor.id.clone(),
            name: factor.name.clone(),
            levels: factor
                .levels
                .iter()
                .map(|level| {
                    let at_level: Vec<f64> = responses
                        .iter()
                        .filter(|(_, row)| row.factor_levels.get(&factor.id) == Some(level))
                        .map(|(response, _)| *response)
                        .collect();
                    let mean_response = mean(&at_level);
                    LevelEffect {
                        level: level.clone(),
                        mean_response,
                        delta_from_overall: mean_response.map(|m| m - overall_mean),
                        count: at_level.len(),
                    }
                })
                .collect(),
        })
        .collect();

    FactorEffectSummary {
        overall_mean: Some(overall_mean),
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{MatrixOptions, create_matrix_rows};
    use crate::domain::{ExperimentRun, Factor, InstrumentRecord, Level};
    use crate::io::source::MemoryExports;
    use crate::io::store::ExperimentStore;

    fn design() -> ExperimentDesign {
        let factors = vec![Factor {
            id: "dose".into(),
            name: "Dose".into(),
            levels: vec![Level::from(100.0), Level::from(50.0)],
        }];
        ExperimentDesign {
            id: "design-1".into(),
            name: "Dose".into(),
            created_by_user_id: None,
            created_at: None,
            matrix: create_matrix_rows(&factors, &MatrixOptions::default()),
            factors,
            generator: None,
        }
    }

    fn run(id: &str, series: &str, row: &str) -> ExperimentRun {
        ExperimentRun {
            id: id.into(),
            run_series_id: Some(series.into()),
            design_id: Some("design-1".into()),
            design_row_id: Some(row.into()),
        }
    }

    fn record(run_id: &str, path: &str) -> InstrumentRecord {
        InstrumentRecord {
            id: format!("rec-{run_id}"),
            run_id: run_id.into(),
            data_path: Some(path.into()),
        }
    }

    fn fixture() -> (ExperimentStore, MemoryExports) {
        let store = ExperimentStore {
            runs: vec![
                run("run-1", "series-1", "row_1"),
                run("run-2", "series-1", "row_2"),
                run("run-3", "series-2", "row_1"),
                run("run-4", "series-1", "row_missing"),
            ],
            instrument_records: vec![
                record("run-1", "r1.csv"),
                record("run-2", "r2.csv"),
                record("run-3", "r3.csv"),
                record("run-4", "r4.csv"),
            ],
            experiment_designs: vec![design()],
        };
        let exports = MemoryExports::new()
            .with_file("r1.csv", "SampleID,OD\nS1,0.5\nS2,0.7\n")
            .with_file("r2.csv", "SampleID,OD\nS1,0.4\n")
            .with_file("r3.csv", "SampleID,OD\nS1,9.9\n")
            .with_file("r4.csv", "SampleID,OD\nS1,9.9\n");
        (store, exports)
    }

    #[tokio::test]
    async fn main_effects_per_level() {
        let (store, exports) = fixture();
        let summary = calculate_factor_effects(&store, &exports, &design(), "series-1", &ColumnSpec::default())
            .await
            .unwrap();

        assert!((summary.overall_mean.unwrap() - 0.5).abs() < 1e-12);
        let dose = &summary.factors[0];
        assert_eq!(dose.id, "dose");
        assert_eq!(dose.levels[0].level, Level::Number(100.0));
        assert!((dose.levels[0].mean_response.unwrap() - 0.6).abs() < 1e-12);
        assert!((dose.levels[0].delta_from_overall.unwrap() - 0.1).abs() < 1e-12);
        assert!((dose.levels[1].delta_from_overall.unwrap() + 0.1).abs() < 1e-12);
        assert_eq!(dose.levels[1].count, 1);
    }

    #[tokio::test]
    async fn missing_series_or_responses() {
        let (store, exports) = fixture();
        assert!(
            calculate_factor_effects(&store, &exports, &design(), "", &ColumnSpec::default())
                .await
                .is_none()
        );

        let summary = calculate_factor_effects(&store, &MemoryExports::new(), &design(), "series-1", &ColumnSpec::default())
            .await
            .unwrap();
        assert_eq!(summary, FactorEffectSummary::default());
    }

    #[tokio::test]
    async fn run_response_ignores_sample_ids() {
        let (store, _) = fixture();
        let exports = MemoryExports::new().with_file("r1.csv", "SampleID,OD\n,0.2\nS2,0.4\nS3,x\n");
        let response = calculate_run_response(&store, &exports, "run-1", &ColumnSpec::default()).await;
        assert!((response.unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn text_and_number_levels_differ() {
        let mut d = design();
        d.factors[0].levels.push(Level::from("100"));
        let row = d.matrix[0].clone();
        let summary = summarize_effects(&d, &[(1.0, &row)]);
        assert_eq!(summary.factors[0].levels[0].count, 1);
        assert_eq!(summary.factors[0].levels[2].count, 0);
        assert_eq!(summary.factors[0].levels[2].mean_response, None);
    }
}
