use crate::error::{ExtractionError, Field};
use crate::extract::{Extractor, PriceExtractor, TableExtractor, TitleExtractor};
use crate::record::{ExtractedFields, ListingRecord, ListingReference};
use chrono::{FixedOffset, Local, NaiveDateTime, TimeZone};
use scraper::Html;

/// Builds immutable [`ListingRecord`]s from listing snapshots.
///
/// Timestamps on listing pages carry no zone. They are read in the local zone
/// unless a fixed UTC offset is pinned with [`RecordAssembler::with_offset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAssembler {
    offset: Option<FixedOffset>,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret page timestamps at a fixed UTC offset
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    /// Extract every field of one listing and derive its epoch fields.
    ///
    /// Title, price and the detail table are read in that order; the first
    /// failure is returned and no record is produced.
    pub fn assemble(
        &self,
        reference: &ListingReference,
        doc: &Html,
    ) -> Result<ListingRecord, ExtractionError> {
        let title = TitleExtractor.extract(doc)?;
        let price = PriceExtractor.extract(doc)?;
        let table = TableExtractor.extract(doc)?;

        let times = table.times;
        let listed_at = times.listed_at;
        let sold_at = times.updated_at;
        let listed_at_epoch = self.to_epoch(listed_at, &times.listed_text)?;
        let sold_at_epoch = self.to_epoch(sold_at, &times.updated_text)?;

        if sold_at_epoch < listed_at_epoch {
            return Err(ExtractionError::OutOfOrder {
                listed: times.listed_text,
                sold: times.updated_text,
            });
        }

        let record = ListingRecord::new(
            reference,
            ExtractedFields {
                title,
                price,
                seller_name: table.seller.name,
                seller_likes: table.seller.likes,
                seller_bads: table.seller.bads,
                listed_at,
                sold_at,
            },
            listed_at_epoch,
            sold_at_epoch,
        );

        tracing::debug!("Listed at: {}, UNIX: {}", listed_at, listed_at_epoch);
        tracing::debug!("Sold at: {}, UNIX: {}", sold_at, sold_at_epoch);
        tracing::debug!("Elapsed hours: {}", record.elapsed_hours());

        Ok(record)
    }

    fn to_epoch(&self, naive: NaiveDateTime, raw: &str) -> Result<i64, ExtractionError> {
        match self.offset {
            Some(offset) => epoch_in(&offset, naive, raw),
            None => epoch_in(&Local, naive, raw),
        }
    }
}

/// Seconds since the epoch of a wall-clock time read in `tz`.
///
/// A time repeated by a backward clock change resolves to its earliest
/// instant. A time skipped by a forward change is a `time` format error
/// carrying the page text `raw`.
fn epoch_in<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, raw: &str) -> Result<i64, ExtractionError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| {
            ExtractionError::format(Field::Time, raw, "time does not exist in the local zone")
        })
}
