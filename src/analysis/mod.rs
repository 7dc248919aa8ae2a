//! Run-level analysis over instrument exports.
//!
//! - `aggregate`: concurrent export loading and per-file reduction of readings
//! - `standard_curve`: standard curve fit plus LOD/LOQ, CV, accuracy, precision
//! - `controls`: per-label control status
//! - `effects`: factor main effects across a run series
//!
//! None of these fail on bad data. Unreadable exports are skipped, missing
//! quantities come back as `None`, and suspicious wells become warnings.

pub mod aggregate;
pub mod controls;
pub mod effects;
pub mod standard_curve;

pub use aggregate::*;
pub use controls::*;
pub use effects::*;
pub use standard_curve::*;
