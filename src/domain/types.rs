//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during analysis
//! - exported to JSON for callers (camelCase keys, explicit `null` for undefined numbers)
//! - reloaded from a stored experiment/design file

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One parsed data row: header → trimmed cell text.
///
/// Ragged rows simply lack the keys for their missing trailing cells.
pub type Row = HashMap<String, String>;

/// Header-keyed rows parsed from one instrument export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularRecord {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl TabularRecord {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Acceptable OD range declared inside a control sample id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlRange {
    pub min: f64,
    pub max: f64,
}

impl ControlRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for ControlRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// A scalar factor level.
///
/// Levels compare strictly: the number `100` and the string `"100"` are different levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level {
    Number(f64),
    Text(String),
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Number(v) => write!(f, "{v}"),
            Level::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        Level::Number(value)
    }
}

impl From<&str> for Level {
    fn from(value: &str) -> Self {
        Level::Text(value.to_string())
    }
}

/// An experiment factor and its ordered levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub levels: Vec<Level>,
}

/// One run of a generated design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignMatrixRow {
    pub id: String,
    pub run_number: usize,
    #[serde(default)]
    pub factor_levels: BTreeMap<String, Level>,
    #[serde(default)]
    pub block: Option<Level>,
    #[serde(default)]
    pub replicate: Option<usize>,
}

/// Factors plus the generated matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignMatrix {
    pub factors: Vec<Factor>,
    pub matrix: Vec<DesignMatrixRow>,
}

/// Which procedural generator to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Titer,
    Blocks,
    /// Any other `type` value; treated like no generator at all.
    #[serde(other)]
    Unknown,
}

/// Every key a design generator understands, with its default.
///
/// - `titer`: `levels` verbatim, or `start_value / dilution_factor^i` for `i in 0..count`
/// - `blocks`: `factors` plus a `block` factor built from `blocks`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    #[serde(rename = "type")]
    pub kind: Option<GeneratorKind>,
    pub factor_id: Option<String>,
    pub factor_name: Option<String>,
    pub levels: Vec<Level>,
    pub start_value: Option<f64>,
    pub dilution_factor: Option<f64>,
    pub count: Option<usize>,
    pub replicates: Option<usize>,
    pub factors: Vec<Factor>,
    pub blocks: Vec<Level>,
    pub block_name: Option<String>,
}

impl GeneratorConfig {
    /// Replicate count, with missing/zero meaning a single pass.
    pub fn replicate_count(&self) -> usize {
        match self.replicates {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }
}

/// A stored experiment design (immutable reference data once created).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentDesign {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_by_user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub factors: Vec<Factor>,
    #[serde(default)]
    pub matrix: Vec<DesignMatrixRow>,
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
}

/// The slice of an experiment run the analysis needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentRun {
    pub id: String,
    #[serde(default)]
    pub run_series_id: Option<String>,
    #[serde(default)]
    pub design_id: Option<String>,
    #[serde(default)]
    pub design_row_id: Option<String>,
}

/// A plate-reader export attached to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRecord {
    pub id: String,
    pub run_id: String,
    #[serde(default)]
    pub data_path: Option<String>,
}

/// Which logistic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "4PL")]
    FourPl,
    #[serde(rename = "5PL")]
    FivePl,
}

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::FourPl => "4PL",
            ModelKind::FivePl => "5PL",
        }
    }

    /// Number of free parameters (`a, b, c, d` plus `g` for 5PL).
    pub fn param_count(self) -> usize {
        match self {
            ModelKind::FourPl => 4,
            ModelKind::FivePl => 5,
        }
    }
}

/// Logistic parameters.
///
/// - `a`: response as `x → 0`
/// - `d`: response as `x → ∞`
/// - `c`: inflection point
/// - `b`: slope
/// - `g`: asymmetry (5PL only)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g: Option<f64>,
}

impl LogisticParams {
    /// Asymmetry factor; 4PL behaves like `g = 1`.
    pub fn asymmetry(&self) -> f64 {
        self.g.unwrap_or(1.0)
    }
}

/// A fitted dose-response model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveModel {
    pub kind: ModelKind,
    pub parameters: LogisticParams,
    pub sse: f64,
    pub r_squared: Option<f64>,
}

/// Mean OD at one standard concentration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardPoint {
    pub concentration: f64,
    #[serde(rename = "meanOD")]
    pub mean_od: f64,
    #[serde(rename = "readingCount")]
    pub reading_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFits {
    pub four_pl: Option<CurveModel>,
    pub five_pl: Option<CurveModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardCurve {
    pub selected_model: Option<CurveModel>,
    pub models: ModelFits,
    pub points: Vec<StandardPoint>,
}

/// Blank-derived detection and quantification limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LodMetrics {
    pub blank_mean_od: Option<f64>,
    pub blank_sd_od: Option<f64>,
    pub lod_od: Option<f64>,
    pub loq_od: Option<f64>,
    pub lod_concentration: Option<f64>,
    pub loq_concentration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleCv {
    pub sample_id: String,
    pub readings: usize,
    pub mean_od: f64,
    pub sd_od: f64,
    pub cv_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyEntry {
    pub expected_concentration: f64,
    pub measured_concentration: f64,
    pub percent_recovery: f64,
    pub readings: usize,
    pub average_od: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecisionEntry {
    pub expected_concentration: f64,
    pub cv_percent: Option<f64>,
    pub readings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub lod: LodMetrics,
    pub cv: Vec<SampleCv>,
    pub accuracy: Vec<AccuracyEntry>,
    pub precision: Vec<PrecisionEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    StandardMissingConcentration,
    ControlOutOfRange,
}

/// What a control flag refers to: a raw sample id or a normalized control label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlagSubject {
    SampleId(String),
    ControlLabel(String),
}

impl FlagSubject {
    pub fn as_str(&self) -> &str {
        match self {
            FlagSubject::SampleId(s) | FlagSubject::ControlLabel(s) => s,
        }
    }
}

/// A control whose mean OD fell outside its declared range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlFlag {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    #[serde(flatten)]
    pub subject: FlagSubject,
    pub average_od: f64,
    pub range: ControlRange,
    pub out_of_range: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub sample_id: String,
    pub message: String,
}

/// Everything derived from one run's standard wells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardCurveSummary {
    pub standard_curve: StandardCurve,
    pub metrics: QualityMetrics,
    pub control_flags: Vec<ControlFlag>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Per-label control status (labels are normalized so range syntax doesn't split groups).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlStatus {
    pub control_label: String,
    pub readings: usize,
    pub average_od: f64,
    pub range: Option<ControlRange>,
    pub out_of_range: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlSummary {
    pub controls: Vec<ControlStatus>,
    pub warnings: Vec<ControlFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEffect {
    pub level: Level,
    pub mean_response: Option<f64>,
    pub delta_from_overall: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorEffect {
    pub id: String,
    pub name: String,
    pub levels: Vec<LevelEffect>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorEffectSummary {
    pub overall_mean: Option<f64>,
    pub factors: Vec<FactorEffect>,
}

/// Gradient-descent settings for logistic fitting.
///
/// The defaults are empirical; they are not guaranteed to converge on
/// ill-conditioned data and there is no restart strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Minimum number of standard points before a fit is attempted.
    pub min_points: usize,
    pub max_iterations: usize,
    pub learning_rate: f64,
    /// Multiplier applied after an accepted step.
    pub learning_rate_growth: f64,
    pub learning_rate_max: f64,
    /// Multiplier applied after a rejected step.
    pub learning_rate_decay: f64,
    /// Optimization stops once the learning rate decays to this floor.
    pub learning_rate_min: f64,
    /// Lower bound for `b`, `c` and `g`.
    pub param_floor: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_points: 4,
            max_iterations: 300,
            learning_rate: 0.001,
            learning_rate_growth: 1.05,
            learning_rate_max: 0.05,
            learning_rate_decay: 0.5,
            learning_rate_min: 1e-6,
            param_floor: 1e-6,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let positive = [
            ("learning_rate", self.learning_rate),
            ("learning_rate_growth", self.learning_rate_growth),
            ("learning_rate_max", self.learning_rate_max),
            ("learning_rate_decay", self.learning_rate_decay),
            ("learning_rate_min", self.learning_rate_min),
            ("param_floor", self.param_floor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AppError::Config(format!("{name} must be finite and > 0")));
            }
        }
        if self.learning_rate_decay >= 1.0 {
            return Err(AppError::Config("learning_rate_decay must be < 1".into()));
        }
        if self.min_points < 4 {
            return Err(AppError::Config("min_points must be at least 4".into()));
        }
        Ok(())
    }
}

/// Which headers carry the sample id and the OD reading.
///
/// Candidates are tried in order. The sample id is the first non-empty value;
/// the OD comes from the first candidate header present in the row, even if
/// that cell is not numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub sample_id: Vec<String>,
    pub od: Vec<String>,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            sample_id: vec!["SampleID".to_string(), "sampleId".to_string()],
            od: vec!["OD".to_string(), "od".to_string()],
        }
    }
}

impl ColumnSpec {
    pub fn sample_id<'a>(&self, row: &'a Row) -> Option<&'a str> {
        self.sample_id
            .iter()
            .filter_map(|h| row.get(h))
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }

    pub fn od(&self, row: &Row) -> Option<f64> {
        let raw = self.od.iter().find_map(|h| row.get(h))?;
        parse_finite(raw)
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    let v = s.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn column_spec_prefers_first_non_empty_sample_id() {
        let columns = ColumnSpec::default();
        let r = row(&[("SampleID", ""), ("sampleId", "Std 10"), ("od", "0.5")]);
        assert_eq!(columns.sample_id(&r), Some("Std 10"));
        assert_eq!(columns.od(&r), Some(0.5));
    }

    #[test]
    fn column_spec_od_uses_first_present_header() {
        let columns = ColumnSpec::default();
        // `OD` is present but blank, so `od` is not consulted.
        let r = row(&[("SampleID", "S1"), ("OD", ""), ("od", "0.5")]);
        assert_eq!(columns.od(&r), None);
    }

    #[test]
    fn levels_round_trip_untagged() {
        let levels: Vec<Level> = serde_json::from_str(r#"[100, "A", 12.5]"#).unwrap();
        assert_eq!(levels, vec![Level::Number(100.0), Level::from("A"), Level::Number(12.5)]);
        assert_ne!(Level::Number(100.0), Level::from("100"));
        assert_eq!(Level::Number(100.0).to_string(), "100");
    }

    #[test]
    fn unknown_generator_type_is_tolerated() {
        let cfg: GeneratorConfig = serde_json::from_str(r#"{"type": "latin-square"}"#).unwrap();
        assert_eq!(cfg.kind, Some(GeneratorKind::Unknown));
        assert_eq!(cfg.replicate_count(), 1);
    }

    #[test]
    fn control_flag_serializes_subject_inline() {
        let flag = ControlFlag {
            kind: WarningKind::ControlOutOfRange,
            subject: FlagSubject::SampleId("Control (0.1-0.3)".into()),
            average_od: 0.5,
            range: ControlRange { min: 0.1, max: 0.3 },
            out_of_range: true,
            message: "m".into(),
        };
        let v = serde_json::to_value(&flag).unwrap();
        assert_eq!(v["type"], "control_out_of_range");
        assert_eq!(v["sampleId"], "Control (0.1-0.3)");
        assert_eq!(v["outOfRange"], true);
    }

    #[test]
    fn default_fit_config_is_valid() {
        assert!(FitConfig::default().validate().is_ok());
        let bad = FitConfig {
            learning_rate: f64::NAN,
            ..FitConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
