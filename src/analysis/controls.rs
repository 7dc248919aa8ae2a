//! Control well status for a run.
//!
//! Controls are grouped by their normalized label, so `Control [0.1-0.3]`
//! and `Control min=0.1 max=0.3` pool into one `Control` group. The range of
//! a group is the first one declared by any of its wells.

use std::collections::BTreeMap;

use crate::analysis::aggregate::{load_exports, readings};
use crate::domain::{
    ColumnSpec, ControlFlag, ControlRange, ControlStatus, ControlSummary, FlagSubject, TabularRecord,
    WarningKind,
};
use crate::io::source::{ExportIndex, ExportReader};
use crate::math::mean;
use crate::sample::{is_control, normalize_control_label, parse_control_range};

#[derive(Default)]
struct ControlGroup {
    readings: Vec<f64>,
    range: Option<ControlRange>,
}

pub async fn build_control_summary<I, R>(index: &I, reader: &R, run_id: &str, columns: &ColumnSpec) -> ControlSummary
where
    I: ExportIndex + ?Sized,
    R: ExportReader,
{
    let records = load_exports(index, reader, run_id).await;
    summarize_controls(&records, columns)
}

pub fn summarize_controls(records: &[TabularRecord], columns: &ColumnSpec) -> ControlSummary {
    let mut groups: BTreeMap<String, ControlGroup> = BTreeMap::new();
    for (sample_id, od) in records.iter().flat_map(|record| readings(record, columns)) {
        if !is_control(sample_id) {
            continue;
        }
        let label = match normalize_control_label(sample_id) {
            label if label.is_empty() => sample_id.to_string(),
            label => label,
        };
        let group = groups.entry(label).or_default();
        group.readings.push(od);
        if group.range.is_none() {
            group.range = parse_control_range(sample_id);
        }
    }

    let mut summary = ControlSummary::default();
    for (control_label, group) in groups {
        let Some(average_od) = mean(&group.readings) else {
            continue;
        };
        let out_of_range = group.range.is_some_and(|r| !r.contains(average_od));
        if let (true, Some(range)) = (out_of_range, group.range) {
            tracing::warn!(control = %control_label, average_od, %range, "Control outside declared range");
            summary.warnings.push(ControlFlag {
                kind: WarningKind::ControlOutOfRange,
                subject: FlagSubject::ControlLabel(control_label.clone()),
                average_od,
                range,
                out_of_range: true,
                message: format!("{control_label} average OD {average_od:.3} outside {range}."),
            });
        }
        summary.controls.push(ControlStatus {
            control_label,
            readings: group.readings.len(),
            average_od,
            range: group.range,
            out_of_range,
        });
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::table::parse_rows;

    #[test]
    fn groups_by_normalized_label() {
        let records = vec![
            parse_rows("SampleID,OD\nControl [0.1-0.3],0.4\nNeg control,0.02\nS1,0.9\n"),
            parse_rows("SampleID,OD\nControl min=0.1 max=0.3,0.6\n"),
        ];
        let summary = summarize_controls(&records, &ColumnSpec::default());

        assert_eq!(summary.controls.len(), 2);
        let control = &summary.controls[0];
        assert_eq!(control.control_label, "Control");
        assert_eq!(control.readings, 2);
        assert!((control.average_od - 0.5).abs() < 1e-12);
        assert_eq!(control.range, Some(ControlRange { min: 0.1, max: 0.3 }));
        assert!(control.out_of_range);

        let negative = &summary.controls[1];
        assert_eq!(negative.control_label, "Neg control");
        assert_eq!(negative.range, None);
        assert!(!negative.out_of_range);

        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].subject, FlagSubject::ControlLabel("Control".into()));
        assert_eq!(summary.warnings[0].message, "Control average OD 0.500 outside 0.1-0.3.");
    }

    #[test]
    fn label_that_normalizes_to_nothing_keeps_raw_id() {
        let records = vec![parse_rows("SampleID,OD\n(control 0.1-0.2),0.15\n")];
        let summary = summarize_controls(&records, &ColumnSpec::default());
        assert_eq!(summary.controls[0].control_label, "(control 0.1-0.2)");
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn serializes_with_control_label_key() {
        let records = vec![parse_rows("SampleID,OD\nControl (1-2),3\n")];
        let summary = summarize_controls(&records, &ColumnSpec::default());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["warnings"][0]["controlLabel"], "Control");
        assert_eq!(json["warnings"][0]["type"], "control_out_of_range");
        assert_eq!(json["controls"][0]["range"]["min"], 1.0);
    }
}
