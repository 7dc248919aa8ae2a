//! Seams to the storage collaborators.
//!
//! The analysis never touches storage directly. It asks an `ExportIndex`
//! which exports belong to a run, reads them through an `ExportReader`, and
//! asks a `RunCatalog` which runs belong to a series. Reads are async so a
//! caller can issue them concurrently; a failed read only drops that file.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::domain::ExperimentRun;
use crate::error::AppError;

/// Locates the instrument exports attached to a run.
pub trait ExportIndex {
    fn export_paths(&self, run_id: &str) -> Vec<PathBuf>;
}

/// Reads export text.
pub trait ExportReader {
    fn read_export(&self, path: &Path) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Lists the runs of a series that were executed against a design.
pub trait RunCatalog {
    fn series_runs(&self, run_series_id: &str, design_id: &str) -> Vec<ExperimentRun>;
}

/// Reads exports from disk, resolving relative paths against a storage root.
#[derive(Debug, Clone)]
pub struct FsExportReader {
    root: PathBuf,
}

impl FsExportReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExportReader for FsExportReader {
    fn read_export(&self, path: &Path) -> impl Future<Output = Result<String, AppError>> + Send {
        let full = self.root.join(path);
        async move {
            tokio::fs::read_to_string(&full)
                .await
                .map_err(|e| AppError::io(full.clone(), e))
        }
    }
}

/// In-memory exports keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryExports {
    files: HashMap<PathBuf, String>,
}

impl MemoryExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl ExportReader for MemoryExports {
    fn read_export(&self, path: &Path) -> impl Future<Output = Result<String, AppError>> + Send {
        let result = self.files.get(path).cloned().ok_or_else(|| {
            AppError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such export"),
            )
        });
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_reader_resolves_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("plates")).unwrap();
        std::fs::write(dir.path().join("plates/p1.csv"), "SampleID,OD\nS1,0.1\n").unwrap();

        let reader = FsExportReader::new(dir.path());
        let text = reader.read_export(Path::new("plates/p1.csv")).await.unwrap();
        assert!(text.starts_with("SampleID"));

        let err = reader.read_export(Path::new("plates/missing.csv")).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn memory_reader_misses_are_errors() {
        let exports = MemoryExports::new().with_file("a.csv", "x");
        assert_eq!(exports.read_export(Path::new("a.csv")).await.unwrap(), "x");
        assert!(exports.read_export(Path::new("b.csv")).await.is_err());
    }
}
