//! Logistic dose-response model implementations.
//!
//! Models are implemented as small, pure functions so that fitting/QC code can
//! stay generic over 4PL and 5PL.

pub mod model;

pub use model::*;
