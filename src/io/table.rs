//! Delimited-text parsing for plate-reader exports.
//!
//! This module turns export text into header-keyed rows and nothing more:
//! no sample classification and no numeric parsing happen here.
//!
//! Parsing is deliberately forgiving:
//! - blank lines are dropped
//! - fewer than two non-blank lines gives an empty record (not an error)
//! - ragged rows are zipped against the header by position; missing trailing
//!   cells are simply absent and extra cells are dropped

use csv::StringRecord;

use crate::domain::{Row, TabularRecord};

/// Headers every canonical export must carry.
pub const REQUIRED_HEADERS: [&str; 2] = ["SampleID", "OD"];

/// Parse export text into a `TabularRecord`.
pub fn parse_rows(content: &str) -> TabularRecord {
    let lines: Vec<&str> = content.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return TabularRecord::default();
    }

    let headers: Vec<String> = split_line(lines[0]).iter().map(|h| clean_cell(h)).collect();

    let rows = lines[1..]
        .iter()
        .map(|line| {
            let cells = split_line(line);
            headers
                .iter()
                .zip(cells.iter())
                .map(|(header, value)| (header.clone(), clean_cell(value)))
                .collect::<Row>()
        })
        .collect();

    TabularRecord { headers, rows }
}

/// Header names only (first non-blank line), for validation.
pub fn parse_header(content: &str) -> Vec<String> {
    content
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| split_line(line).iter().map(|h| clean_cell(h)).collect())
        .unwrap_or_default()
}

/// Check that export text is usable as a canonical `SampleID,OD` export.
///
/// Returns one human-readable message per problem; empty means valid.
pub fn validate_csv_content(content: &str, context: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let headers = parse_header(content);
    if headers.is_empty() {
        errors.push(format!("{context} must include a header row"));
        return errors;
    }

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        errors.push(format!("{context} missing required columns: {}", missing.join(", ")));
    }

    let non_blank = content.lines().filter(|line| !line.trim().is_empty()).count();
    if non_blank < 2 {
        errors.push(format!("{context} must include at least one data row"));
    }

    errors
}

fn split_line(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_string).collect(),
        // Malformed quoting: fall back to a plain comma split.
        _ => line.split(',').map(str::to_string).collect(),
    }
}

// Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
// first header; strip it together with surrounding whitespace.
fn clean_cell(value: &str) -> String {
    value
        .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows_are_keyed() {
        let text = "\u{feff}SampleID , OD,Well\nStd 10, 1.25 ,A1\n\nBlank,0.05,A2\n";
        let rec = parse_rows(text);
        assert_eq!(rec.headers, vec!["SampleID", "OD", "Well"]);
        assert_eq!(rec.rows.len(), 2);
        assert_eq!(rec.rows[0]["SampleID"], "Std 10");
        assert_eq!(rec.rows[0]["OD"], "1.25");
        assert_eq!(rec.rows[1]["Well"], "A2");
    }

    #[test]
    fn crlf_and_ragged_rows() {
        let text = "SampleID,OD,Well\r\nS1,0.5\r\nS2,0.6,B1,extra\r\n";
        let rec = parse_rows(text);
        assert_eq!(rec.rows.len(), 2);
        assert!(!rec.rows[0].contains_key("Well"));
        assert_eq!(rec.rows[1].len(), 3);
    }

    #[test]
    fn too_few_lines_is_empty() {
        assert!(parse_rows("").is_empty());
        assert!(parse_rows("SampleID,OD\n\n   \n").is_empty());
    }

    #[test]
    fn row_count_matches_data_lines() {
        let mut text = String::from("SampleID,OD\n");
        for i in 0..25 {
            text.push_str(&format!("S{i},{}\n", i as f64 / 10.0));
        }
        let rec = parse_rows(&text);
        assert_eq!(rec.headers.len(), 2);
        assert_eq!(rec.rows.len(), 25);
    }

    #[test]
    fn quoted_cells_keep_commas() {
        let rec = parse_rows("SampleID,OD\n\"Std, lot 7 10\",0.9\n");
        assert_eq!(rec.rows[0]["SampleID"], "Std, lot 7 10");
    }

    #[test]
    fn validation_reports_missing_columns_and_rows() {
        assert!(validate_csv_content("SampleID,OD\nS1,0.1\n", "Export").is_empty());

        let errs = validate_csv_content("Sample,OD\n", "Export");
        assert_eq!(errs.len(), 2);
        assert!(errs[0].contains("missing required columns: SampleID"));
        assert!(errs[1].contains("at least one data row"));

        let errs = validate_csv_content("  \n", "Export");
        assert_eq!(errs, vec!["Export must include a header row".to_string()]);
    }
}
