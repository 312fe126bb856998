//! Report sinks
//!
//! Renders an assembled session report as an aligned text table or a
//! pretty-printed JSON document, written to stdout or a file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use vwap_engine::report::SessionReport;

/// Output rendering selected on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Aligned per-security snapshot table
    Table,
    /// Pretty-printed JSON document
    Json,
}

/// Render `report` and write it to `output`, or stdout when no path is
/// given.
pub fn write_report(
    report: &SessionReport,
    output: Option<&Path>,
    format: Format,
) -> Result<(), anyhow::Error> {
    let rendered = match format {
        Format::Table => render_table(report),
        Format::Json => render_json(report)?,
    };

    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("unable to write report to {}", path.display()))?,
        None => io::stdout().write_all(rendered.as_bytes())?,
    }
    Ok(())
}

/// Pretty-printed JSON with stable field order and a trailing newline.
pub fn render_json(report: &SessionReport) -> Result<String, anyhow::Error> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}

/// Aligned snapshot rows per security, followed by a one-line counter
/// summary. Hour labels are all five characters wide, so a fixed column
/// width lines everything up.
pub fn render_table(report: &SessionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<8}  {:<5}  {}\n", "security", "hour", "vwap"));
    for (symbol, rows) in &report.vwap {
        for row in rows {
            out.push_str(&format!(
                "{:<8}  {:<5}  {}\n",
                symbol, row.hour_label, row.vwap
            ));
        }
    }

    let stats = &report.stats;
    out.push_str(&format!(
        "\nMessages: {} | Malformed: {} | Trades: {} | After close: {} | Regressions: {} | Securities: {} | Snapshots: {} | Diagnostics: {}\n",
        stats.messages_parsed,
        stats.malformed_messages,
        stats.trades_applied,
        stats.trades_after_close,
        stats.clock_regressions,
        report.securities(),
        report.total_snapshots(),
        report.diagnostics.len() as u64 + report.diagnostics_dropped,
    ));
    out
}
