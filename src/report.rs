//! Markdown rendering of quality checks and KPIs.

use std::{fmt::Write as _, fs, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::{data::format_number, io_utils, kpis::Kpis, quality::QualityReport};

pub fn render_report(quality: &QualityReport, kpis: &Kpis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Quality Report\n");
    let _ = writeln!(out, "Rows: {}\n", quality.rows);

    let _ = writeln!(out, "## Quality Checks\n");
    let _ = writeln!(out, "### Missing values\n");
    table(
        &mut out,
        &["Column", "Missing"],
        quality
            .missing_values
            .iter()
            .map(|c| vec![c.column.clone(), c.count.to_string()]),
    );

    let _ = writeln!(out, "### Negative values\n");
    table(
        &mut out,
        &["Column", "Negative"],
        quality
            .negative_values
            .iter()
            .map(|c| vec![c.column.clone(), c.count.to_string()]),
    );

    let _ = writeln!(out, "### Out of bounds\n");
    let global = quality
        .out_of_bounds
        .iter()
        .map(|c| vec![c.column.clone(), "global".to_string(), c.count.to_string()]);
    let by_category = quality.out_of_category_bounds.iter().map(|c| {
        vec![
            c.column.clone(),
            format!("category {}", c.category),
            c.count.to_string(),
        ]
    });
    table(
        &mut out,
        &["Column", "Scope", "Count"],
        global.chain(by_category),
    );

    let _ = writeln!(out, "### Invalid values\n");
    table(
        &mut out,
        &["Column", "Values"],
        quality.invalid_values.iter().map(|c| {
            let values = if c.values.is_empty() {
                "-".to_string()
            } else {
                c.values.iter().map(|v| escape_cell(v)).join(", ")
            };
            vec![c.column.clone(), values]
        }),
    );

    let _ = writeln!(out, "## KPIs\n");
    table(
        &mut out,
        &["Column", "Count", "Total", "Mean"],
        kpis.numeric.iter().map(|k| {
            vec![
                k.column.clone(),
                k.count.to_string(),
                format_number(k.total),
                k.mean
                    .map(|m| format_number(round_to(m, 4)))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        }),
    );
    if let Some(category) = &kpis.category_column {
        let _ = writeln!(out, "### Rows per {category}\n");
        table(
            &mut out,
            &[category.as_str(), "Rows"],
            kpis.count_by_category
                .iter()
                .map(|(value, count)| vec![escape_cell(value), count.to_string()]),
        );
    }
    out
}

pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    io_utils::ensure_parent_dir(path)?;
    fs::write(path, contents).with_context(|| format!("Writing report to {path:?}"))
}

fn table(out: &mut String, headers: &[&str], rows: impl Iterator<Item = Vec<String>>) {
    let rows = rows.collect::<Vec<_>>();
    if rows.is_empty() {
        let _ = writeln!(out, "None.\n");
        return;
    }
    let _ = writeln!(out, "| {} |", headers.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(headers.len()));
    for row in rows {
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }
    out.push('\n');
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
