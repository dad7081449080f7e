use crate::OutputFormat;
use anyhow::{Context, Result, bail};
use scraper::Html;
use soldlist_core::{ListingReference, enumerate_listings};
use std::path::Path;
use url::Url;

/// Enumerate listing links on a search page saved to disk
pub fn enumerate_links(file: &Path, base_url: &str) -> Result<Vec<ListingReference>> {
    let markup = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let base = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;

    let doc = Html::parse_document(&markup);
    Ok(enumerate_listings(&doc, &base))
}

pub fn execute(
    file: &Path,
    base_url: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let mut references = enumerate_links(file, base_url)?;
    if let Some(limit) = limit {
        references.truncate(limit);
    }

    match format {
        OutputFormat::Pretty => {
            for (i, reference) in references.iter().enumerate() {
                println!("{:>4}  {}", i + 1, reference);
            }
        }
        OutputFormat::Json => {
            let urls: Vec<&str> = references.iter().map(|r| r.as_str()).collect();
            println!("{}", serde_json::to_string_pretty(&urls)?);
        }
        OutputFormat::Xlsx => bail!("xlsx output is only available for harvest"),
    }

    Ok(())
}
