//! Write analysis results to disk.
//!
//! JSON is the portable representation: the same camelCase shape callers of
//! the library receive, with explicit `null` for undefined numbers.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::AppError;

/// Write any serializable result as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|e| AppError::json(path, e))
}

pub fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    std::fs::write(path, text).map_err(|e| AppError::io(path, e))
}

/// Read a JSON document (generator configs, factor lists, designs).
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| AppError::json(path, e))
}
