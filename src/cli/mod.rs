//! Command-line parsing for the immunoassay analysis tool.
//!
//! Argument parsing and command dispatch stay separate from the analysis
//! code; `app` turns these structs into library calls.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "assay", version, about = "ELISA standard curves, QC metrics and design analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the standard curve of a run and report QC metrics and controls.
    Summary(SummaryArgs),
    /// Generate a design matrix from a generator config.
    Design(DesignArgs),
    /// Compute factor main effects for a run series.
    Effects(EffectsArgs),
    /// Rewrite a vendor plate-reader export as canonical SampleID/OD CSV.
    Normalize(NormalizeArgs),
    /// Check an export CSV or a design JSON without analysing it.
    Validate(ValidateArgs),
}

/// Where runs, instrument records and designs live.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Experiment store JSON (runs, instrumentRecords, experimentDesigns).
    #[arg(long, value_name = "JSON")]
    pub store: PathBuf,

    /// Root that instrument `dataPath`s are relative to.
    ///
    /// Defaults to ASSAY_STORAGE_ROOT, else the store file's directory.
    #[arg(long, value_name = "DIR", env = "ASSAY_STORAGE_ROOT")]
    pub root: Option<PathBuf>,
}

/// Optimizer settings for the logistic fits.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Minimum number of standard concentrations before fitting.
    #[arg(long, default_value_t = 4)]
    pub min_points: usize,

    /// Gradient-descent iteration cap.
    #[arg(long, default_value_t = 300)]
    pub max_iterations: usize,

    /// Initial learning rate.
    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Run id to analyse.
    #[arg(long)]
    pub run: String,

    #[command(flatten)]
    pub fit: FitArgs,

    /// Write the full report as JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DesignArgs {
    /// Generator config JSON (`type`, `levels`, `startValue`, ...).
    #[arg(long, value_name = "JSON")]
    pub generator: PathBuf,

    /// Factor list JSON used when the generator has no recognised type.
    #[arg(long, value_name = "JSON")]
    pub factors: Option<PathBuf>,

    /// Write `{factors, matrix}` as JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EffectsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Design id the runs were executed against.
    #[arg(long)]
    pub design: String,

    /// Run series id.
    #[arg(long)]
    pub series: String,

    /// Write the effect summary as JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct NormalizeArgs {
    /// Vendor export CSV.
    #[arg(long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Reader template id (see `--list-templates`).
    #[arg(long)]
    pub template: Option<String>,

    /// Instrument type used to narrow template detection.
    #[arg(long)]
    pub instrument: Option<String>,

    /// Canonical CSV to write.
    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Print the known reader templates and exit.
    #[arg(long)]
    pub list_templates: bool,
}

#[derive(Debug, Args, Clone)]
#[group(required = true, multiple = false)]
pub struct ValidateArgs {
    /// Export CSV to check for SampleID/OD columns and data rows.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Experiment design JSON to check.
    #[arg(long, value_name = "JSON")]
    pub design_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_summary_with_defaults() {
        let cli = Cli::try_parse_from(["assay", "summary", "--store", "store.json", "--run", "run-1", "--root", "/data"])
            .unwrap();
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.run, "run-1");
        assert_eq!(args.store.root, Some(PathBuf::from("/data")));
        assert_eq!(args.fit.max_iterations, 300);
        assert!(args.export.is_none());
    }

    #[test]
    fn validate_needs_exactly_one_input() {
        assert!(Cli::try_parse_from(["assay", "validate"]).is_err());
        assert!(Cli::try_parse_from(["assay", "validate", "--csv", "a.csv", "--design-file", "d.json"]).is_err());
        assert!(Cli::try_parse_from(["assay", "validate", "--csv", "a.csv"]).is_ok());
    }
}
