//! Report writers for harvested listings.

use anyhow::Result;
use chrono::{DateTime, Local};
use console::style;
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use soldlist_core::report::{COLUMNS, Cell, row};
use soldlist_core::{ListingRecord, RunReport};
use std::path::{Path, PathBuf};

/// Default report file name, stamped with the run start time
pub fn default_output_path(started_at: &DateTime<Local>, extension: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}_listings.{}",
        started_at.format("%Y%m%d_%H%M"),
        extension
    ))
}

/// Write records to an xlsx workbook.
///
/// The first column is a 1-based row index, followed by [`COLUMNS`] under
/// their Japanese headings.
pub fn write_xlsx(records: &[ListingRecord], path: &Path) -> Result<()> {
    tracing::debug!("Writing {} records to {}", records.len(), path.display());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("listings")?;

    for (col, column) in COLUMNS.iter().enumerate() {
        worksheet.write_string(0, (col + 1) as u16, column.ja)?;
    }

    for (i, record) in records.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_number(r, 0, r as f64)?;

        for (col, cell) in row(record).iter().enumerate() {
            let c = (col + 1) as u16;
            match cell {
                Cell::Text(text) => worksheet.write_string(r, c, text)?,
                Cell::Unsigned(value) => worksheet.write_number(r, c, *value as f64)?,
                Cell::Integer(value) => worksheet.write_number(r, c, *value as f64)?,
                Cell::Real(value) => worksheet.write_number(r, c, *value)?,
            };
        }
    }

    workbook.save(path)?;
    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    url: &'a str,
    field: &'static str,
    error: String,
}

#[derive(Serialize)]
struct JsonAbort<'a> {
    url: &'a str,
    error: &'a str,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    processed: usize,
    records: &'a [ListingRecord],
    failures: Vec<JsonFailure<'a>>,
    aborted: Option<JsonAbort<'a>>,
}

/// Serialize a run as pretty JSON
pub fn render_json(report: &RunReport) -> Result<String> {
    let failures = report
        .failures
        .iter()
        .map(|f| JsonFailure {
            url: &f.url,
            field: f.error.field().as_str(),
            error: f.error.to_string(),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&JsonReport {
        processed: report.processed,
        records: &report.records,
        failures,
        aborted: report.aborted.as_ref().map(|a| JsonAbort {
            url: &a.url,
            error: &a.reason,
        }),
    })?)
}

/// One record as `label: value` lines, Japanese and English headings side by side
pub fn render_record(record: &ListingRecord) -> String {
    COLUMNS
        .iter()
        .zip(row(record))
        .map(|(column, cell)| format!("{} / {}: {}\n", column.ja, column.en, cell))
        .collect()
}

/// Print a run summary to stdout
pub fn print_summary(report: &RunReport) {
    println!(
        "{} {} of {} listings harvested",
        style("✓").green(),
        style(report.succeeded()).bold(),
        report.processed
    );

    if report.degraded > 0 {
        println!(
            "{} {} pages were snapshotted before fully rendering",
            style("!").yellow(),
            report.degraded
        );
    }

    for failure in &report.failures {
        println!(
            "{} {} [{}] {}",
            style("✗").red(),
            failure.url,
            failure.error.field(),
            failure.error
        );
    }

    if let Some(abort) = &report.aborted {
        println!(
            "{} Run stopped at {}: {}",
            style("✗").red().bold(),
            abort.url,
            abort.reason
        );
    }
}
