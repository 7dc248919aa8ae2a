//! Plain-text formatting of analysis results.

use crate::domain::{
    ControlStatus, CurveModel, DesignMatrix, FactorEffectSummary, StandardCurveSummary,
};
use crate::io::templates::ReaderTemplate;

/// Standard curve, selected model and QC metrics.
pub fn format_standard_curve(run_id: &str, summary: &StandardCurveSummary) -> String {
    let mut out = String::new();
    let curve = &summary.standard_curve;

    out.push_str(&format!("=== assay - Standard Curve (run {run_id}) ===\n"));
    out.push_str(&format!("Standards: n={}\n", curve.points.len()));

    out.push_str("\nModel diagnostics:\n");
    let selected = curve.selected_model.as_ref().map(|m| m.kind);
    for fit in [&curve.models.four_pl, &curve.models.five_pl].into_iter().flatten() {
        let chosen = if Some(fit.kind) == selected { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<4} SSE={:.6} R2={}\n",
            fit.kind.display_name(),
            fit.sse,
            fmt_opt(fit.r_squared, 4)
        ));
    }
    match &curve.selected_model {
        Some(model) => {
            out.push_str("\nChosen model:\n");
            out.push_str(&format!("- {}\n", model.kind.display_name()));
            out.push_str(&format!("- params: {}\n", fmt_params(model)));
        }
        None => out.push_str("  (no model: fewer than 4 standard concentrations)\n"),
    }

    let lod = &summary.metrics.lod;
    out.push_str("\nLimits:\n");
    out.push_str(&format!(
        "- blank mean OD={} sd={}\n",
        fmt_opt(lod.blank_mean_od, 4),
        fmt_opt(lod.blank_sd_od, 4)
    ));
    out.push_str(&format!(
        "- LOD OD={} conc={}\n",
        fmt_opt(lod.lod_od, 4),
        fmt_opt(lod.lod_concentration, 4)
    ));
    out.push_str(&format!(
        "- LOQ OD={} conc={}\n",
        fmt_opt(lod.loq_od, 4),
        fmt_opt(lod.loq_concentration, 4)
    ));

    if !curve.points.is_empty() {
        out.push_str("\nStandards:\n");
        out.push_str(&table_row(&["conc", "mean_od", "n", "measured", "recovery%", "cv%"]));
        out.push_str(&table_rule(6));
        for point in &curve.points {
            let accuracy = summary
                .metrics
                .accuracy
                .iter()
                .find(|a| a.expected_concentration == point.concentration);
            let precision = summary
                .metrics
                .precision
                .iter()
                .find(|p| p.expected_concentration == point.concentration);
            out.push_str(&table_row(&[
                format!("{:.4}", point.concentration),
                format!("{:.4}", point.mean_od),
                point.reading_count.to_string(),
                fmt_opt(accuracy.map(|a| a.measured_concentration), 4),
                fmt_opt(accuracy.map(|a| a.percent_recovery), 1),
                fmt_opt(precision.and_then(|p| p.cv_percent), 2),
            ]));
        }
    }

    if !summary.metrics.cv.is_empty() {
        out.push_str("\nSamples:\n");
        out.push_str(&table_row(&["sample", "n", "mean_od", "sd_od", "cv%"]));
        out.push_str(&table_rule(5));
        for s in &summary.metrics.cv {
            out.push_str(&table_row(&[
                truncate(&s.sample_id, 12),
                s.readings.to_string(),
                format!("{:.4}", s.mean_od),
                format!("{:.4}", s.sd_od),
                fmt_opt(s.cv_percent, 2),
            ]));
        }
    }

    if !summary.control_flags.is_empty() || !summary.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for flag in &summary.control_flags {
            out.push_str(&format!("- {}\n", flag.message));
        }
        for warning in &summary.warnings {
            out.push_str(&format!("- {}\n", warning.message));
        }
    }

    out
}

/// Per-label control status.
pub fn format_controls(controls: &[ControlStatus]) -> String {
    let mut out = String::from("Controls:\n");
    if controls.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    out.push_str(&table_row(&["label", "n", "avg_od", "range", "status"]));
    out.push_str(&table_rule(5));
    for c in controls {
        let status = match (c.range, c.out_of_range) {
            (None, _) => "-",
            (Some(_), true) => "OUT",
            (Some(_), false) => "ok",
        };
        out.push_str(&table_row(&[
            truncate(&c.control_label, 12),
            c.readings.to_string(),
            format!("{:.3}", c.average_od),
            c.range.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
            status.to_string(),
        ]));
    }
    out
}

pub fn format_design(design: &DesignMatrix) -> String {
    let mut out = String::new();
    out.push_str("Factors:\n");
    for factor in &design.factors {
        let levels: Vec<String> = factor.levels.iter().map(|l| l.to_string()).collect();
        out.push_str(&format!("- {} ({}): [{}]\n", factor.name, factor.id, levels.join(", ")));
    }

    out.push_str(&format!("\nMatrix: {} runs\n", design.matrix.len()));
    let mut header = vec!["run".to_string()];
    header.extend(design.factors.iter().map(|f| f.id.clone()));
    header.push("replicate".to_string());
    out.push_str(&table_row(&header));
    out.push_str(&table_rule(header.len()));

    for row in &design.matrix {
        let mut cells = vec![row.run_number.to_string()];
        cells.extend(design.factors.iter().map(|f| {
            row.factor_levels
                .get(&f.id)
                .map(|l| truncate(&l.to_string(), 12))
                .unwrap_or_else(|| "-".to_string())
        }));
        cells.push(row.replicate.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()));
        out.push_str(&table_row(&cells));
    }
    out
}

pub fn format_effects(summary: &FactorEffectSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Overall mean response: {}\n", fmt_opt(summary.overall_mean, 4)));
    for factor in &summary.factors {
        out.push_str(&format!("\n{} ({}):\n", factor.name, factor.id));
        out.push_str(&table_row(&["level", "n", "mean", "delta"]));
        out.push_str(&table_rule(4));
        for level in &factor.levels {
            out.push_str(&table_row(&[
                truncate(&level.level.to_string(), 12),
                level.count.to_string(),
                fmt_opt(level.mean_response, 4),
                fmt_signed(level.delta_from_overall),
            ]));
        }
    }
    out
}

pub fn format_templates(templates: &[ReaderTemplate]) -> String {
    let mut out = String::from("Reader templates:\n");
    for t in templates {
        out.push_str(&format!("- {:<20} {:<10} {}\n", t.id, t.instrument_type, t.name));
    }
    out
}

fn fmt_params(model: &CurveModel) -> String {
    let p = &model.parameters;
    let mut out = format!("a={:.6} b={:.6} c={:.6} d={:.6}", p.a, p.b, p.c, p.d);
    if let Some(g) = p.g {
        out.push_str(&format!(" g={g:.6}"));
    }
    out
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => "-".to_string(),
    }
}

fn fmt_signed(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{v:+.4}"),
        _ => "-".to_string(),
    }
}

fn table_row<S: AsRef<str>>(cells: &[S]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().map(|c| c.as_ref()).enumerate() {
        if i == 0 {
            line.push_str(&format!("{cell:<12}"));
        } else {
            line.push_str(&format!(" {cell:>10}"));
        }
    }
    format!("{}\n", line.trim_end())
}

fn table_rule(columns: usize) -> String {
    let mut line = format!("{:-<12}", "");
    for _ in 1..columns {
        line.push_str(&format!(" {:-<10}", ""));
    }
    format!("{line}\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
