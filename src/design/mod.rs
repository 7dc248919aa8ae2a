//! Experiment design matrices.
//!
//! - `matrix`: full-factorial row generation and the procedural generators
//!   (serial dilution titers, blocked layouts)
//! - `validate`: structural checks for stored designs

pub mod matrix;
pub mod validate;

pub use matrix::*;
pub use validate::*;
