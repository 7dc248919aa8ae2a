//! Mathematical utilities: descriptive statistics for QC metrics.

pub mod stats;

pub use stats::*;
