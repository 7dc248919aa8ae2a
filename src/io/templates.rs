//! Reader templates: vendor header aliases for plate-reader exports.
//!
//! Different instruments label the same columns differently (`Sample ID`,
//! `Abs 450`, `Position`, ...). A template lists the accepted aliases per
//! canonical column; normalization rewrites an export into the canonical
//! `SampleID,OD[,Well][,Wavelength]` layout the analysis expects.

use serde::Serialize;

use crate::domain::TabularRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderAliases {
    pub sample_id: Vec<String>,
    pub od: Vec<String>,
    pub well: Vec<String>,
    pub wavelength: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderTemplate {
    pub id: String,
    pub name: String,
    pub instrument_type: String,
    pub description: String,
    pub header_aliases: HeaderAliases,
}

impl ReaderTemplate {
    fn new(
        id: &str,
        name: &str,
        instrument_type: &str,
        description: &str,
        aliases: [&[&str]; 4],
    ) -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            instrument_type: instrument_type.to_string(),
            description: description.to_string(),
            header_aliases: HeaderAliases {
                sample_id: owned(aliases[0]),
                od: owned(aliases[1]),
                well: owned(aliases[2]),
                wavelength: owned(aliases[3]),
            },
        }
    }

    /// A template applies when both the sample-id and OD columns are found.
    pub fn matches(&self, headers: &[String]) -> bool {
        find_header_match(headers, &self.header_aliases.sample_id).is_some()
            && find_header_match(headers, &self.header_aliases.od).is_some()
    }
}

/// The set of known templates, passed explicitly to whoever needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRegistry {
    templates: Vec<ReaderTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new(builtin_templates())
    }
}

impl TemplateRegistry {
    pub fn new(templates: Vec<ReaderTemplate>) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &[ReaderTemplate] {
        &self.templates
    }

    /// Pick a template for an export.
    ///
    /// - an explicit `template_id` wins (and yields `None` if unknown)
    /// - otherwise the first template of `instrument_type` whose aliases match
    /// - otherwise the first template whose aliases match
    pub fn resolve(
        &self,
        template_id: Option<&str>,
        instrument_type: Option<&str>,
        headers: &[String],
    ) -> Option<&ReaderTemplate> {
        if let Some(id) = template_id {
            return self.templates.iter().find(|t| t.id == id);
        }

        if let Some(kind) = instrument_type {
            let matched = self
                .templates
                .iter()
                .filter(|t| t.instrument_type == kind)
                .find(|t| t.matches(headers));
            if matched.is_some() {
                return matched;
            }
        }

        self.templates.iter().find(|t| t.matches(headers))
    }
}

pub fn builtin_templates() -> Vec<ReaderTemplate> {
    vec![
        ReaderTemplate::new(
            "generic",
            "Generic CSV",
            "reader",
            "Generic export with Sample ID and OD columns.",
            [
                &["sampleid", "sample id", "sample"],
                &["od", "absorbance", "abs", "optical density"],
                &["well", "well position", "wellid"],
                &["wavelength", "wavelength (nm)", "lambda"],
            ],
        ),
        ReaderTemplate::new(
            "bioRad_microplate",
            "Bio-Rad Microplate",
            "bioRad",
            "Bio-Rad microplate reader export.",
            [
                &["sample id", "sampleid", "sample"],
                &["od", "absorbance", "abs 450", "abs 450nm"],
                &["well", "well position", "wellid"],
                &["wavelength", "wavelength (nm)"],
            ],
        ),
        ReaderTemplate::new(
            "tecan_infinite",
            "Tecan Infinite",
            "tecan",
            "Tecan Infinite reader export.",
            [
                &["sample", "sample id", "sampleid"],
                &["od", "abs 450", "absorbance 450", "absorbance"],
                &["well", "position", "well position"],
                &["wavelength", "wavelength (nm)", "lambda"],
            ],
        ),
    ]
}

fn normalize_header(value: &str) -> String {
    value.trim().to_lowercase()
}

/// First header (in export order) that equals one of the aliases, ignoring case.
pub fn find_header_match<'a>(headers: &'a [String], aliases: &[String]) -> Option<&'a str> {
    let wanted: Vec<String> = aliases.iter().map(|a| normalize_header(a)).collect();
    headers
        .iter()
        .find(|h| wanted.contains(&normalize_header(h)))
        .map(String::as_str)
}

/// Which export headers were mapped onto the canonical columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedHeaders {
    pub sample_id: String,
    pub od: String,
    pub well: Option<String>,
    pub wavelength: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedRow {
    #[serde(rename = "SampleID")]
    pub sample_id: String,
    #[serde(rename = "OD")]
    pub od: String,
    pub well: Option<String>,
    pub wavelength: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedExport {
    pub rows: Vec<NormalizedRow>,
    pub detected_headers: DetectedHeaders,
}

/// Map an export onto canonical columns using `template`.
///
/// Returns `None` when the export lacks a sample-id or OD column. Rows with
/// an empty sample id or OD are dropped.
pub fn normalize_instrument_rows(record: &TabularRecord, template: &ReaderTemplate) -> Option<NormalizedExport> {
    let aliases = &template.header_aliases;
    let sample_header = find_header_match(&record.headers, &aliases.sample_id)?;
    let od_header = find_header_match(&record.headers, &aliases.od)?;
    let well_header = find_header_match(&record.headers, &aliases.well);
    let wavelength_header = find_header_match(&record.headers, &aliases.wavelength);

    let optional = |row: &crate::domain::Row, header: Option<&str>| {
        header
            .and_then(|h| row.get(h))
            .filter(|v| !v.is_empty())
            .cloned()
    };

    let rows = record
        .rows
        .iter()
        .filter_map(|row| {
            let sample_id = row.get(sample_header).filter(|v| !v.is_empty())?;
            let od = row.get(od_header).filter(|v| !v.is_empty())?;
            Some(NormalizedRow {
                sample_id: sample_id.clone(),
                od: od.clone(),
                well: optional(row, well_header),
                wavelength: optional(row, wavelength_header),
            })
        })
        .collect();

    Some(NormalizedExport {
        rows,
        detected_headers: DetectedHeaders {
            sample_id: sample_header.to_string(),
            od: od_header.to_string(),
            well: well_header.map(str::to_string),
            wavelength: wavelength_header.map(str::to_string),
        },
    })
}

/// Render normalized rows as canonical CSV.
///
/// `Well` / `Wavelength` columns are only emitted when at least one row has a value.
pub fn build_normalized_csv(rows: &[NormalizedRow]) -> String {
    let include_well = rows.iter().any(|r| r.well.is_some());
    let include_wavelength = rows.iter().any(|r| r.wavelength.is_some());

    let mut header = vec!["SampleID", "OD"];
    if include_well {
        header.push("Well");
    }
    if include_wavelength {
        header.push("Wavelength");
    }

    let mut lines = vec![header.join(",")];
    for row in rows {
        let mut values = vec![row.sample_id.as_str(), row.od.as_str()];
        if include_well {
            values.push(row.well.as_deref().unwrap_or(""));
        }
        if include_wavelength {
            values.push(row.wavelength.as_deref().unwrap_or(""));
        }
        lines.push(values.join(","));
    }
    lines.join("\n")
}
