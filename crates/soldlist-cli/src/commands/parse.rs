use crate::OutputFormat;
use crate::report::render_record;
use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use scraper::Html;
use soldlist_core::{ListingRecord, ListingReference, RecordAssembler};
use std::path::Path;

/// Assemble a record from a listing page saved to disk
pub fn parse_listing(file: &Path, url: &str, utc_offset: Option<FixedOffset>) -> Result<ListingRecord> {
    tracing::debug!("Reading listing page: {}", file.display());
    let markup = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let reference = ListingReference::parse(url)?;
    let assembler = match utc_offset {
        Some(offset) => RecordAssembler::with_offset(offset),
        None => RecordAssembler::new(),
    };

    let doc = Html::parse_document(&markup);
    let record = assembler
        .assemble(&reference, &doc)
        .with_context(|| format!("Failed to extract listing from {}", file.display()))?;
    Ok(record)
}

pub fn execute(
    file: &Path,
    url: &str,
    utc_offset: Option<FixedOffset>,
    format: OutputFormat,
) -> Result<()> {
    let record = parse_listing(file, url, utc_offset)?;

    match format {
        OutputFormat::Pretty => print!("{}", render_record(&record)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Xlsx => bail!("xlsx output is only available for harvest"),
    }

    Ok(())
}
