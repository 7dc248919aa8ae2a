//! Terminal reports.
//!
//! Formatting lives here so the analysis code stays free of presentation and
//! output changes are localized.

pub mod format;

pub use format::*;
