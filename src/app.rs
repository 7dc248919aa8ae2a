//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads the store / generator / export inputs
//! - runs the analysis on a current-thread runtime
//! - prints reports and writes optional JSON exports

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DesignArgs, EffectsArgs, FitArgs, NormalizeArgs, SummaryArgs, ValidateArgs};
use crate::design::{generate_design_matrix, validate_design};
use crate::domain::{ColumnSpec, ExperimentDesign, Factor, FitConfig, GeneratorConfig};
use crate::error::AppError;
use crate::io::export::{read_json, write_json, write_text};
use crate::io::source::FsExportReader;
use crate::io::store::ExperimentStore;
use crate::io::table::{parse_rows, validate_csv_content};
use crate::io::templates::{TemplateRegistry, build_normalized_csv, normalize_instrument_rows};

pub mod pipeline;

/// Entry point for the `assay` binary.
pub fn run() -> Result<(), AppError> {
    // Before parsing so `ASSAY_STORAGE_ROOT` from `.env` feeds clap's `env` fallback.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Design(args) => handle_design(args),
        Command::Effects(args) => handle_effects(args),
        Command::Normalize(args) => handle_normalize(args),
        Command::Validate(args) => handle_validate(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Ignore the error if a subscriber is already installed (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn runtime() -> Result<tokio::runtime::Runtime, AppError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Config(format!("Failed to start async runtime: {e}")))
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.fit);
    config.validate()?;

    let store = ExperimentStore::load(&args.store.store)?;
    let root = pipeline::resolve_storage_root(args.store.root.clone(), &args.store.store);
    let reader = FsExportReader::new(root);
    let columns = ColumnSpec::default();

    let report = runtime()?.block_on(pipeline::run_summary(&store, &reader, &args.run, &columns, &config))?;

    println!("{}", crate::report::format_controls(&report.controls));
    println!("{}", crate::report::format_standard_curve(&report.run_id, &report.standard_curve));
    if let Some(effects) = &report.factor_effects {
        println!("{}", crate::report::format_effects(effects));
    }

    if let Some(path) = &args.export {
        write_json(path, &report)?;
    }
    Ok(())
}

fn handle_design(args: DesignArgs) -> Result<(), AppError> {
    let generator: GeneratorConfig = read_json(&args.generator)?;
    let fallback: Vec<Factor> = match &args.factors {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let design = generate_design_matrix(&generator, &fallback);
    println!("{}", crate::report::format_design(&design));

    if let Some(path) = &args.export {
        write_json(path, &design)?;
    }
    Ok(())
}

fn handle_effects(args: EffectsArgs) -> Result<(), AppError> {
    let store = ExperimentStore::load(&args.store.store)?;
    let root = pipeline::resolve_storage_root(args.store.root.clone(), &args.store.store);
    let reader = FsExportReader::new(root);
    let columns = ColumnSpec::default();

    let effects = runtime()?.block_on(pipeline::run_effects(
        &store,
        &reader,
        &args.design,
        &args.series,
        &columns,
    ))?;
    println!("{}", crate::report::format_effects(&effects));

    if let Some(path) = &args.export {
        write_json(path, &effects)?;
    }
    Ok(())
}

fn handle_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let registry = TemplateRegistry::default();
    if args.list_templates {
        println!("{}", crate::report::format_templates(registry.templates()));
        return Ok(());
    }

    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        return Err(AppError::Config("normalize needs --input and --output".to_string()));
    };

    let content = read_text(input)?;
    let record = parse_rows(&content);
    let template = registry
        .resolve(args.template.as_deref(), args.instrument.as_deref(), &record.headers)
        .ok_or_else(|| {
            AppError::Validation(vec![format!(
                "No reader template matches the headers of '{}'",
                input.display()
            )])
        })?;
    let normalized = normalize_instrument_rows(&record, template).ok_or_else(|| {
        AppError::Validation(vec![format!(
            "Template '{}' found no sample id / OD columns in '{}'",
            template.id,
            input.display()
        )])
    })?;

    tracing::info!(
        template = %template.id,
        sample_id = %normalized.detected_headers.sample_id,
        od = %normalized.detected_headers.od,
        rows = normalized.rows.len(),
        "Normalized export"
    );
    write_text(output, &build_normalized_csv(&normalized.rows))?;
    println!(
        "Wrote {} rows to {} (template: {})",
        normalized.rows.len(),
        output.display(),
        template.id
    );
    Ok(())
}

fn handle_validate(args: ValidateArgs) -> Result<(), AppError> {
    let (errors, subject) = match (&args.csv, &args.design_file) {
        (Some(path), _) => {
            let content = read_text(path)?;
            (validate_csv_content(&content, &path.display().to_string()), path)
        }
        (None, Some(path)) => {
            let design: ExperimentDesign = read_json(path)?;
            (validate_design(&design), path)
        }
        (None, None) => return Err(AppError::Config("validate needs --csv or --design-file".to_string())),
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    println!("{}: OK", subject.display());
    Ok(())
}

fn read_text(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        min_points: args.min_points,
        max_iterations: args.max_iterations,
        learning_rate: args.learning_rate,
        ..FitConfig::default()
    }
}
