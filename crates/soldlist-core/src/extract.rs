//! Field extractors for listing detail pages.
//!
//! Each extractor reads one semantic field out of a parsed document. The
//! seller and time fields live in the detail table, which is indexed once by
//! row label before either of them is read.

use crate::error::{ExtractionError, Field};
use crate::record::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("h1.item-name").unwrap();
    static ref PRICE: Selector = Selector::parse("span.item-price.bold").unwrap();
    static ref DETAIL_TABLE: Selector = Selector::parse("table.item-detail-table").unwrap();
    static ref TABLE_ROW: Selector = Selector::parse("tr").unwrap();
    static ref ROW_LABEL: Selector = Selector::parse("th").unwrap();
    static ref ROW_VALUE: Selector = Selector::parse("td").unwrap();
    static ref SELLER_LINK: Selector = Selector::parse("a").unwrap();
    static ref SELLER_RATINGS: Selector = Selector::parse("div.item-user-ratings span").unwrap();
    static ref PRICE_PATTERN: Regex = Regex::new(r"[0-9](?:[0-9,，]*[0-9])?").unwrap();
}

/// Row labels of the seller cell
pub const SELLER_LABELS: &[&str] = &["出品者", "Seller"];
/// Row labels of the listing time cell
pub const LISTED_LABELS: &[&str] = &["出品日時", "Listed at"];
/// Row labels of the last update (sale) time cell
pub const UPDATED_LABELS: &[&str] = &["更新日時", "Updated at"];

/// A rule that reads one field (or field group) from a listing document.
pub trait Extractor {
    type Output;

    fn extract(&self, doc: &Html) -> Result<Self::Output, ExtractionError>;
}

pub struct TitleExtractor;

impl Extractor for TitleExtractor {
    type Output = String;

    fn extract(&self, doc: &Html) -> Result<Self::Output, ExtractionError> {
        let node = doc
            .select(&TITLE)
            .next()
            .ok_or_else(|| ExtractionError::missing(Field::Title, "no h1.item-name node"))?;

        let title = element_text(&node);
        if title.is_empty() {
            return Err(ExtractionError::missing(Field::Title, "item name is blank"));
        }

        tracing::debug!("Title: {}", title);
        Ok(title)
    }
}

pub struct PriceExtractor;

impl Extractor for PriceExtractor {
    type Output = u64;

    fn extract(&self, doc: &Html) -> Result<Self::Output, ExtractionError> {
        let node = doc
            .select(&PRICE)
            .next()
            .ok_or_else(|| ExtractionError::missing(Field::Price, "no span.item-price.bold node"))?;

        let price = normalize_price(&element_text(&node))?;
        tracing::debug!("Price: {}", price);
        Ok(price)
    }
}

/// Seller block of the detail table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seller {
    pub name: String,
    pub likes: u64,
    pub bads: u64,
}

/// Listing and last-update times of the detail table, with the cell text
/// they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTimes {
    pub listed_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub listed_text: String,
    pub updated_text: String,
}

/// Everything read from the detail table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFields {
    pub seller: Seller,
    pub times: ListingTimes,
}

pub struct TableExtractor;

impl Extractor for TableExtractor {
    type Output = TableFields;

    fn extract(&self, doc: &Html) -> Result<Self::Output, ExtractionError> {
        let table = DetailTable::from_document(doc);
        tracing::debug!("Detail table has {} labeled rows", table.len());

        let seller = extract_seller(table.require(Field::Seller, SELLER_LABELS)?)?;
        let times = extract_times(
            table.require(Field::Time, LISTED_LABELS)?,
            table.require(Field::Time, UPDATED_LABELS)?,
        )?;

        Ok(TableFields { seller, times })
    }
}

/// Label text → value cell map for the item detail table.
///
/// Each row's header cell is paired with the value cell of the same row, so
/// a row without a value cannot shift the remaining labels. The first row
/// carrying a label wins.
#[derive(Debug, Default)]
pub struct DetailTable<'a> {
    cells: HashMap<String, ElementRef<'a>>,
}

impl<'a> DetailTable<'a> {
    /// Index the first detail table in the document (empty when absent)
    pub fn from_document(doc: &'a Html) -> Self {
        let mut cells = HashMap::new();

        if let Some(table) = doc.select(&DETAIL_TABLE).next() {
            for row in table.select(&TABLE_ROW) {
                let (Some(label), Some(value)) =
                    (row.select(&ROW_LABEL).next(), row.select(&ROW_VALUE).next())
                else {
                    continue;
                };
                cells.entry(element_text(&label)).or_insert(value);
            }
        }

        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value cell of the first label alias present in the table
    pub fn lookup(&self, labels: &[&str]) -> Option<ElementRef<'a>> {
        labels.iter().find_map(|label| self.cells.get(*label).copied())
    }

    fn require(&self, field: Field, labels: &[&str]) -> Result<ElementRef<'a>, ExtractionError> {
        self.lookup(labels).ok_or_else(|| {
            ExtractionError::missing(field, format!("no detail row labeled {}", labels.join(" / ")))
        })
    }
}

/// Read the seller name and its like/bad counters from the seller cell
pub fn extract_seller(cell: ElementRef<'_>) -> Result<Seller, ExtractionError> {
    let name = cell
        .select(&SELLER_LINK)
        .next()
        .map(|link| element_text(&link))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ExtractionError::missing(Field::Seller, "no seller link"))?;

    let ratings: Vec<String> = cell.select(&SELLER_RATINGS).map(|n| element_text(&n)).collect();
    if ratings.len() < 2 {
        return Err(ExtractionError::missing(
            Field::Seller,
            format!("expected 2 rating counters, found {}", ratings.len()),
        ));
    }

    let likes = parse_count(&ratings[0])?;
    let bads = parse_count(&ratings[1])?;

    tracing::debug!("Seller: {}", name);
    tracing::debug!("Like: {}", likes);
    tracing::debug!("Bad: {}", bads);

    Ok(Seller { name, likes, bads })
}

/// Parse the listed and updated cells
pub fn extract_times(
    listed: ElementRef<'_>,
    updated: ElementRef<'_>,
) -> Result<ListingTimes, ExtractionError> {
    let listed_text = element_text(&listed);
    let updated_text = element_text(&updated);
    let listed_at = parse_timestamp(&listed_text)?;
    let updated_at = parse_timestamp(&updated_text)?;

    tracing::debug!("Listed at: {}", listed_at);
    tracing::debug!("Updated at: {}", updated_at);

    Ok(ListingTimes {
        listed_at,
        updated_at,
        listed_text,
        updated_text,
    })
}

/// Parse a `YYYY/MM/DD HH:MM:SS` timestamp
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ExtractionError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| ExtractionError::format(Field::Time, raw, e.to_string()))
}

/// Extract a whole-unit price from localized text such as `¥3,500` or
/// `￥３，５００`.
///
/// Normalizing an already separator-free number returns the same value.
pub fn normalize_price(raw: &str) -> Result<u64, ExtractionError> {
    let halfwidth = to_halfwidth_digits(raw);
    let matched = PRICE_PATTERN
        .find(&halfwidth)
        .ok_or_else(|| ExtractionError::format(Field::Price, raw, "no numeric value"))?;

    strip_separators(matched.as_str())
        .parse::<u64>()
        .map_err(|e| ExtractionError::format(Field::Price, raw, e.to_string()))
}

fn parse_count(raw: &str) -> Result<u64, ExtractionError> {
    strip_separators(raw.trim())
        .parse::<u64>()
        .map_err(|e| ExtractionError::format(Field::Seller, raw, e.to_string()))
}

/// Map full-width digits (U+FF10..U+FF19) to ASCII
fn to_halfwidth_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}

fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, ',' | '，')).collect()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
