//! `assay-curves` library crate.
//!
//! The binary (`assay`) is a thin wrapper around this library so that:
//!
//! - the analysis is testable without spawning processes
//! - embedding callers can supply their own storage through the `io::source` traits

pub mod analysis;
pub mod app;
pub mod cli;
pub mod design;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod sample;
