//! Column schema shared by every report writer.

use crate::record::{ListingRecord, TIMESTAMP_FORMAT};
use std::fmt;

/// One report column with its Japanese and English headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub ja: &'static str,
    pub en: &'static str,
}

/// Report columns, in output order
pub const COLUMNS: [Column; 11] = [
    Column { ja: "商品タイトル", en: "Title" },
    Column { ja: "商品URL", en: "URL" },
    Column { ja: "販売価格", en: "Price" },
    Column { ja: "出品者名", en: "Seller name" },
    Column { ja: "出品者評価数(like)", en: "Seller likes" },
    Column { ja: "出品者評価数(bad)", en: "Seller bads" },
    Column { ja: "出品時刻", en: "Listed at" },
    Column { ja: "売却時刻", en: "Sold at" },
    Column { ja: "出品時刻(UNIX)", en: "Listed at (UNIX)" },
    Column { ja: "売却時刻(UNIX)", en: "Sold at (UNIX)" },
    Column { ja: "売却時刻-出品時刻(hours)", en: "Elapsed hours" },
];

/// A typed report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// Prices and rating counters
    Unsigned(u64),
    Integer(i64),
    Real(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Unsigned(value) => write!(f, "{}", value),
            Cell::Integer(value) => write!(f, "{}", value),
            Cell::Real(value) => write!(f, "{:.2}", value),
        }
    }
}

/// Cells of one record, aligned with [`COLUMNS`]
pub fn row(record: &ListingRecord) -> [Cell; 11] {
    [
        Cell::Text(record.title().to_string()),
        Cell::Text(record.url().to_string()),
        Cell::Unsigned(record.price()),
        Cell::Text(record.seller_name().to_string()),
        Cell::Unsigned(record.seller_likes()),
        Cell::Unsigned(record.seller_bads()),
        Cell::Text(record.listed_at().format(TIMESTAMP_FORMAT).to_string()),
        Cell::Text(record.sold_at().format(TIMESTAMP_FORMAT).to_string()),
        Cell::Integer(record.listed_at_epoch()),
        Cell::Integer(record.sold_at_epoch()),
        Cell::Real(record.elapsed_hours()),
    ]
}
