//! Domain types used throughout the analysis.
//!
//! This module defines:
//!
//! - parsed export rows (`TabularRecord`) and column conventions (`ColumnSpec`)
//! - design inputs/outputs (`Factor`, `Level`, `GeneratorConfig`, `DesignMatrixRow`)
//! - curve fitting outputs (`CurveModel`, `StandardPoint`) and `FitConfig`
//! - QC summaries (`StandardCurveSummary`, `ControlSummary`, `FactorEffectSummary`)

pub mod types;

pub use types::*;
