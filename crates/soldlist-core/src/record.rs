use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;
use url::Url;

/// Date-time layout used by listing pages and reports.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// One marketplace listing URL. Identity is the URL string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingReference {
    url: Url,
}

impl ListingReference {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Parse an absolute listing URL
    pub fn parse(url: &str) -> crate::Result<Self> {
        Ok(Self::new(Url::parse(url)?))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for ListingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Sale data extracted from one listing page.
///
/// Records are only built by [`crate::RecordAssembler`] once every field has
/// been extracted, and expose read-only accessors afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    title: String,
    url: String,
    price: u64,
    seller_name: String,
    seller_likes: u64,
    seller_bads: u64,
    #[serde(serialize_with = "serialize_timestamp")]
    listed_at: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    sold_at: NaiveDateTime,
    listed_at_epoch: i64,
    sold_at_epoch: i64,
    elapsed_hours: f64,
}

/// Fields gathered by the extractors, before derived values are computed.
#[derive(Debug, Clone)]
pub(crate) struct ExtractedFields {
    pub title: String,
    pub price: u64,
    pub seller_name: String,
    pub seller_likes: u64,
    pub seller_bads: u64,
    pub listed_at: NaiveDateTime,
    pub sold_at: NaiveDateTime,
}

impl ListingRecord {
    pub(crate) fn new(
        reference: &ListingReference,
        fields: ExtractedFields,
        listed_at_epoch: i64,
        sold_at_epoch: i64,
    ) -> Self {
        Self {
            title: fields.title,
            url: reference.as_str().to_string(),
            price: fields.price,
            seller_name: fields.seller_name,
            seller_likes: fields.seller_likes,
            seller_bads: fields.seller_bads,
            listed_at: fields.listed_at,
            sold_at: fields.sold_at,
            listed_at_epoch,
            sold_at_epoch,
            elapsed_hours: elapsed_hours(listed_at_epoch, sold_at_epoch),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn seller_name(&self) -> &str {
        &self.seller_name
    }

    pub fn seller_likes(&self) -> u64 {
        self.seller_likes
    }

    pub fn seller_bads(&self) -> u64 {
        self.seller_bads
    }

    pub fn listed_at(&self) -> NaiveDateTime {
        self.listed_at
    }

    pub fn sold_at(&self) -> NaiveDateTime {
        self.sold_at
    }

    pub fn listed_at_epoch(&self) -> i64 {
        self.listed_at_epoch
    }

    pub fn sold_at_epoch(&self) -> i64 {
        self.sold_at_epoch
    }

    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed_hours
    }
}

/// Hours between two epoch timestamps, rounded to 2 decimals
pub fn elapsed_hours(listed_at_epoch: i64, sold_at_epoch: i64) -> f64 {
    let hours = (sold_at_epoch - listed_at_epoch) as f64 / 3600.0;
    (hours * 100.0).round() / 100.0
}

fn serialize_timestamp<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
}
