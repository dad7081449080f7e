pub mod assemble;
pub mod enumerate;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod session;
pub mod snapshot;

pub use assemble::RecordAssembler;
pub use enumerate::enumerate_listings;
pub use error::{Error, ExtractionError, Field, Result};
pub use fetch::{FetchOutcome, WaitStatus, fetch};
pub use pipeline::{Harvester, ListingFailure, ListingOutcome, RunAbort, RunOptions, RunReport};
pub use record::{ListingRecord, ListingReference};
pub use session::{BrowserSession, WaitCondition};
pub use snapshot::snapshot;
