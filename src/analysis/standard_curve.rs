//! Standard curve and QC metrics for one run.
//!
//! Standards are averaged per concentration and fitted with both logistic
//! models; the selected model is then used to read concentrations back for
//! LOD/LOQ and accuracy. QC quantities that cannot be computed are `None`
//! (or dropped, for accuracy rows) rather than errors.

use crate::analysis::aggregate::{RunAggregate, load_exports};
use crate::domain::{
    AccuracyEntry, AnalysisWarning, ColumnSpec, ControlFlag, CurveModel, FitConfig, FlagSubject,
    LodMetrics, PrecisionEntry, QualityMetrics, SampleCv, StandardCurve, StandardCurveSummary,
    StandardPoint, WarningKind,
};
use crate::fit::fit_and_select;
use crate::io::source::{ExportIndex, ExportReader};
use crate::math::{mean, sample_sd, spread};
use crate::models::inverse;

/// Blank multiples defining the detection and quantitation limits.
const LOD_SD_MULTIPLE: f64 = 3.0;
const LOQ_SD_MULTIPLE: f64 = 10.0;

/// Load a run's exports and summarize its standard curve and QC metrics.
pub async fn build_standard_curve_summary<I, R>(
    index: &I,
    reader: &R,
    run_id: &str,
    columns: &ColumnSpec,
    config: &FitConfig,
) -> StandardCurveSummary
where
    I: ExportIndex + ?Sized,
    R: ExportReader,
{
    let records = load_exports(index, reader, run_id).await;
    summarize(RunAggregate::from_records(&records, columns), config)
}

/// Summarize already aggregated readings.
pub fn summarize(aggregate: RunAggregate, config: &FitConfig) -> StandardCurveSummary {
    let warnings = aggregate
        .missing_concentration
        .iter()
        .map(|sample_id| {
            tracing::warn!(sample_id = %sample_id, "Standard sample has no concentration");
            AnalysisWarning {
                kind: WarningKind::StandardMissingConcentration,
                sample_id: sample_id.clone(),
                message: format!("Standard sample \"{sample_id}\" is missing a concentration."),
            }
        })
        .collect();

    let control_flags = control_flags(&aggregate);

    let mut buckets = aggregate.standards;
    buckets.sort_by(|l, r| l.concentration.total_cmp(&r.concentration));

    let points: Vec<StandardPoint> = buckets
        .iter()
        .filter_map(|bucket| {
            Some(StandardPoint {
                concentration: bucket.concentration,
                mean_od: mean(&bucket.readings)?,
                reading_count: bucket.readings.len(),
            })
        })
        .collect();

    let selection = fit_and_select(&points, config);
    let selected = selection.best.as_ref();

    let cv = aggregate
        .sample_groups
        .iter()
        .filter_map(|(sample_id, values)| {
            let s = spread(values)?;
            Some(SampleCv {
                sample_id: sample_id.clone(),
                readings: values.len(),
                mean_od: s.mean,
                sd_od: s.sd,
                cv_percent: s.cv_percent,
            })
        })
        .collect();

    let accuracy = selected
        .map(|model| accuracy(&points, model))
        .unwrap_or_default();

    let precision = buckets
        .iter()
        .filter_map(|bucket| {
            let s = spread(&bucket.readings)?;
            Some(PrecisionEntry {
                expected_concentration: bucket.concentration,
                cv_percent: s.cv_percent,
                readings: bucket.readings.len(),
            })
        })
        .collect();

    StandardCurveSummary {
        standard_curve: StandardCurve {
            selected_model: selection.best.clone(),
            models: selection.fits,
            points,
        },
        metrics: QualityMetrics {
            lod: lod_metrics(&aggregate.blanks, selection.best.as_ref()),
            cv,
            accuracy,
            precision,
        },
        control_flags,
        warnings,
    }
}

/// Blank statistics and the limits derived from them.
///
/// Concentrations are only reported when a model is available and the OD
/// limit can be read back off the curve.
pub fn lod_metrics(blanks: &[f64], model: Option<&CurveModel>) -> LodMetrics {
    let Some(blank_mean) = mean(blanks) else {
        return LodMetrics::default();
    };
    let blank_sd = sample_sd(blanks, blank_mean);
    let lod_od = blank_mean + LOD_SD_MULTIPLE * blank_sd;
    let loq_od = blank_mean + LOQ_SD_MULTIPLE * blank_sd;

    LodMetrics {
        blank_mean_od: Some(blank_mean),
        blank_sd_od: Some(blank_sd),
        lod_od: Some(lod_od),
        loq_od: Some(loq_od),
        lod_concentration: model.and_then(|m| read_back(m, lod_od)),
        loq_concentration: model.and_then(|m| read_back(m, loq_od)),
    }
}

fn read_back(model: &CurveModel, od: f64) -> Option<f64> {
    inverse(model.kind, od, &model.parameters)
}

fn accuracy(points: &[StandardPoint], model: &CurveModel) -> Vec<AccuracyEntry> {
    points
        .iter()
        .filter_map(|point| {
            let measured = read_back(model, point.mean_od)?;
            Some(AccuracyEntry {
                expected_concentration: point.concentration,
                measured_concentration: measured,
                percent_recovery: measured / point.concentration * 100.0,
                readings: point.reading_count,
                average_od: point.mean_od,
            })
        })
        .collect()
}

fn control_flags(aggregate: &RunAggregate) -> Vec<ControlFlag> {
    aggregate
        .control_ranges
        .iter()
        .filter_map(|(sample_id, range)| {
            let average_od = mean(aggregate.sample_groups.get(sample_id)?)?;
            if range.contains(average_od) {
                return None;
            }
            tracing::warn!(sample_id = %sample_id, average_od, %range, "Control outside declared range");
            Some(ControlFlag {
                kind: WarningKind::ControlOutOfRange,
                subject: FlagSubject::SampleId(sample_id.clone()),
                average_od,
                range: *range,
                out_of_range: true,
                message: format!("{sample_id} average OD {average_od:.3} outside {range}."),
            })
        })
        .collect()
}
