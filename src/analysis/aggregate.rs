//! Loading and reducing the exports of one run.
//!
//! Exports are read concurrently. Each readable file is reduced into its own
//! `RunAggregate`; the per-file aggregates are then merged in the order the
//! index listed the files, so the result does not depend on which read
//! finished first.

use std::collections::BTreeMap;

use futures::future::join_all;

use crate::domain::{ColumnSpec, ControlRange, Row, TabularRecord};
use crate::io::source::{ExportIndex, ExportReader};
use crate::io::table::parse_rows;
use crate::sample::{is_blank, is_standard, parse_concentration, parse_control_range};

/// Read and parse every export of a run, in index order.
///
/// Files that cannot be read are dropped.
pub async fn load_exports<I, R>(index: &I, reader: &R, run_id: &str) -> Vec<TabularRecord>
where
    I: ExportIndex + ?Sized,
    R: ExportReader,
{
    let paths = index.export_paths(run_id);
    let results = join_all(paths.iter().map(|path| reader.read_export(path))).await;

    paths
        .iter()
        .zip(results)
        .filter_map(|(path, result)| match result {
            Ok(content) => Some(parse_rows(&content)),
            Err(err) => {
                tracing::debug!(run_id, path = %path.display(), error = %err, "Skipping unreadable export");
                None
            }
        })
        .collect()
}

/// Rows with a sample id and a numeric OD, as `(sample id, OD)`.
pub fn readings<'a>(
    record: &'a TabularRecord,
    columns: &'a ColumnSpec,
) -> impl Iterator<Item = (&'a str, f64)> + 'a {
    record.rows.iter().filter_map(|row| reading(row, columns))
}

fn reading<'a>(row: &'a Row, columns: &ColumnSpec) -> Option<(&'a str, f64)> {
    Some((columns.sample_id(row)?, columns.od(row)?))
}

/// Standard readings sharing one concentration.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardBucket {
    pub concentration: f64,
    pub readings: Vec<f64>,
}

/// Readings of a run grouped by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunAggregate {
    /// Every reading, keyed by raw sample id.
    pub sample_groups: BTreeMap<String, Vec<f64>>,
    pub blanks: Vec<f64>,
    /// Standard readings by concentration, in first-seen order.
    pub standards: Vec<StandardBucket>,
    /// One entry per standard reading whose id carries no concentration.
    pub missing_concentration: Vec<String>,
    /// Declared control ranges, first occurrence per sample id.
    pub control_ranges: Vec<(String, ControlRange)>,
}

impl RunAggregate {
    /// Reduce one parsed export.
    pub fn from_record(record: &TabularRecord, columns: &ColumnSpec) -> Self {
        let mut aggregate = Self::default();
        for (sample_id, od) in readings(record, columns) {
            aggregate
                .sample_groups
                .entry(sample_id.to_string())
                .or_default()
                .push(od);

            if is_blank(sample_id) {
                aggregate.blanks.push(od);
            }

            if is_standard(sample_id) {
                match parse_concentration(sample_id) {
                    Some(concentration) => aggregate.add_standard(concentration, vec![od]),
                    None => {
                        aggregate.missing_concentration.push(sample_id.to_string());
                        continue;
                    }
                }
            }

            if let Some(range) = parse_control_range(sample_id) {
                aggregate.add_control_range(sample_id, range);
            }
        }
        aggregate
    }

    /// Combine two aggregates; `self` is treated as the earlier file.
    pub fn merge(mut self, other: RunAggregate) -> Self {
        for (sample_id, values) in other.sample_groups {
            self.sample_groups.entry(sample_id).or_default().extend(values);
        }
        self.blanks.extend(other.blanks);
        for bucket in other.standards {
            self.add_standard(bucket.concentration, bucket.readings);
        }
        self.missing_concentration.extend(other.missing_concentration);
        for (sample_id, range) in other.control_ranges {
            self.add_control_range(&sample_id, range);
        }
        self
    }

    /// Reduce and merge a run's exports.
    pub fn from_records(records: &[TabularRecord], columns: &ColumnSpec) -> Self {
        records
            .iter()
            .map(|record| Self::from_record(record, columns))
            .fold(Self::default(), Self::merge)
    }

    fn add_standard(&mut self, concentration: f64, values: Vec<f64>) {
        match self.standards.iter_mut().find(|b| b.concentration == concentration) {
            Some(bucket) => bucket.readings.extend(values),
            None => self.standards.push(StandardBucket {
                concentration,
                readings: values,
            }),
        }
    }

    fn add_control_range(&mut self, sample_id: &str, range: ControlRange) {
        if !self.control_ranges.iter().any(|(id, _)| id == sample_id) {
            self.control_ranges.push((sample_id.to_string(), range));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::source::MemoryExports;
    use std::path::PathBuf;

    struct Paths(Vec<&'static str>);

    impl ExportIndex for Paths {
        fn export_paths(&self, _run_id: &str) -> Vec<PathBuf> {
            self.0.iter().map(PathBuf::from).collect()
        }
    }

    #[test]
    fn groups_readings_by_role() {
        let record = parse_rows(
            "SampleID,OD\n\
             Std 10,1.0\n\
             Std 10,1.2\n\
             Std 1,0.4\n\
             Blank,0.05\n\
             Std high,0.9\n\
             Control [0.1-0.3],0.2\n\
             S1,n/a\n\
             ,0.7\n",
        );
        let aggregate = RunAggregate::from_record(&record, &ColumnSpec::default());

        assert_eq!(aggregate.sample_groups.len(), 5);
        assert_eq!(aggregate.sample_groups["Std 10"], vec![1.0, 1.2]);
        assert_eq!(aggregate.blanks, vec![0.05]);
        assert_eq!(aggregate.standards.len(), 2);
        assert_eq!(aggregate.standards[0].concentration, 10.0);
        assert_eq!(aggregate.missing_concentration, vec!["Std high".to_string()]);
        assert_eq!(
            aggregate.control_ranges,
            vec![("Control [0.1-0.3]".to_string(), ControlRange { min: 0.1, max: 0.3 })]
        );
    }

    #[test]
    fn empty_od_cell_is_not_a_reading() {
        let record = parse_rows("SampleID,OD\nBlank,\nBlank,0.1\nStd 5,\n");
        let aggregate = RunAggregate::from_record(&record, &ColumnSpec::default());

        assert_eq!(aggregate.blanks, vec![0.1]);
        assert_eq!(aggregate.sample_groups["Blank"], vec![0.1]);
        assert!(aggregate.standards.is_empty());
    }

    #[test]
    fn merge_is_file_order_stable() {
        let first = parse_rows("SampleID,OD\nStd 5,1.0\nControl (1-2),1.5\n");
        let second = parse_rows("SampleID,OD\nStd 5,1.4\nControl (1-2),1.7\nStd 50,2.0\n");
        let columns = ColumnSpec::default();

        let merged = RunAggregate::from_records(&[first, second], &columns);
        assert_eq!(merged.standards[0].readings, vec![1.0, 1.4]);
        assert_eq!(merged.standards[1].concentration, 50.0);
        assert_eq!(merged.sample_groups["Control (1-2)"], vec![1.5, 1.7]);
        assert_eq!(merged.control_ranges.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_exports_are_skipped() {
        let index = Paths(vec!["a.csv", "missing.csv", "b.csv"]);
        let reader = MemoryExports::new()
            .with_file("a.csv", "SampleID,OD\nS1,0.1\n")
            .with_file("b.csv", "SampleID,OD\nS2,0.2\n");

        let records = load_exports(&index, &reader, "run-1").await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rows[0]["SampleID"], "S1");
        assert_eq!(records[1].rows[0]["SampleID"], "S2");
    }
}
