//! JSON-file experiment store.
//!
//! A read-only snapshot of runs, instrument records and designs, as kept by
//! the surrounding tracker. The CLI loads it once per invocation and hands it
//! to the analysis through the `ExportIndex` / `RunCatalog` seams.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ExperimentDesign, ExperimentRun, InstrumentRecord};
use crate::error::AppError;
use crate::io::source::{ExportIndex, RunCatalog};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentStore {
    pub runs: Vec<ExperimentRun>,
    pub instrument_records: Vec<InstrumentRecord>,
    pub experiment_designs: Vec<ExperimentDesign>,
}

impl ExperimentStore {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| AppError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| AppError::json(path, e))
    }

    pub fn run(&self, run_id: &str) -> Result<&ExperimentRun, AppError> {
        self.runs
            .iter()
            .find(|r| r.id == run_id)
            .ok_or_else(|| AppError::NotFound {
                kind: "Run",
                id: run_id.to_string(),
            })
    }

    pub fn design(&self, design_id: &str) -> Result<&ExperimentDesign, AppError> {
        self.experiment_designs
            .iter()
            .find(|d| d.id == design_id)
            .ok_or_else(|| AppError::NotFound {
                kind: "Design",
                id: design_id.to_string(),
            })
    }
}

impl ExportIndex for ExperimentStore {
    fn export_paths(&self, run_id: &str) -> Vec<PathBuf> {
        self.instrument_records
            .iter()
            .filter(|r| r.run_id == run_id)
            .filter_map(|r| r.data_path.as_deref())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect()
    }
}

impl RunCatalog for ExperimentStore {
    fn series_runs(&self, run_series_id: &str, design_id: &str) -> Vec<ExperimentRun> {
        self.runs
            .iter()
            .filter(|r| {
                r.run_series_id.as_deref() == Some(run_series_id) && r.design_id.as_deref() == Some(design_id)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = r#"{
        "runs": [
            {"id": "r1", "runSeriesId": "s1", "designId": "d1", "designRowId": "row_1"},
            {"id": "r2", "runSeriesId": "s1", "designId": "d2"},
            {"id": "r3"}
        ],
        "instrumentRecords": [
            {"id": "i1", "runId": "r1", "dataPath": "plates/a.csv"},
            {"id": "i2", "runId": "r1"},
            {"id": "i3", "runId": "r2", "dataPath": "plates/b.csv"}
        ],
        "experimentDesigns": [
            {"id": "d1", "name": "Titer", "createdAt": "2026-01-05T10:00:00Z", "factors": [], "matrix": []}
        ]
    }"#;

    #[test]
    fn store_answers_index_and_catalog_queries() {
        let store: ExperimentStore = serde_json::from_str(STORE).unwrap();
        assert_eq!(store.export_paths("r1"), vec![PathBuf::from("plates/a.csv")]);
        assert!(store.export_paths("r3").is_empty());

        let runs = store.series_runs("s1", "d1");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, "r1");

        assert!(store.design("d1").unwrap().created_at.is_some());
        assert_eq!(store.run("missing").unwrap_err().exit_code(), 3);
    }

    #[test]
    fn load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ExperimentStore::load(&path).unwrap_err();
        assert!(matches!(err, AppError::Json { .. }));
    }
}
