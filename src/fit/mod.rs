//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit 4PL / 5PL logistic models to standard points (gradient descent)
//! - evaluate both kinds in parallel
//! - select the best model by SSE

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
