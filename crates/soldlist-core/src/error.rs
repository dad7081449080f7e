use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Run-level errors. Only `Session` is fatal to a run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Timed out after {0:?} waiting for page")]
    Timeout(Duration),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Semantic field an extraction error is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Price,
    Seller,
    Time,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Price => "price",
            Field::Seller => "seller",
            Field::Time => "time",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to extract one field from a listing snapshot.
///
/// Scoped to a single listing: the pipeline turns it into a skip decision
/// and moves on to the next listing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("field '{field}' not found: {reason}")]
    Missing { field: Field, reason: String },

    #[error("field '{field}' has unparseable value {raw:?}: {reason}")]
    Format {
        field: Field,
        raw: String,
        reason: String,
    },

    #[error("sold at {sold:?} precedes listed at {listed:?}")]
    OutOfOrder { listed: String, sold: String },
}

impl ExtractionError {
    pub(crate) fn missing(field: Field, reason: impl Into<String>) -> Self {
        ExtractionError::Missing {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn format(field: Field, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractionError::Format {
            field,
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Field the failure is scoped to
    pub fn field(&self) -> Field {
        match self {
            ExtractionError::Missing { field, .. } | ExtractionError::Format { field, .. } => *field,
            ExtractionError::OutOfOrder { .. } => Field::Time,
        }
    }

    /// Offending raw text, present for format errors
    pub fn raw(&self) -> Option<&str> {
        match self {
            ExtractionError::Format { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ExtractionError::Format { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_carries_raw_text() {
        let err = ExtractionError::format(Field::Time, "2024-13-40", "bad pattern");

        assert!(err.is_format());
        assert_eq!(err.field(), Field::Time);
        assert_eq!(err.raw(), Some("2024-13-40"));
        assert!(err.to_string().contains("\"2024-13-40\""));
    }

    #[test]
    fn test_out_of_order_is_scoped_to_time() {
        let err = ExtractionError::OutOfOrder {
            listed: "2024/05/02 00:00:00".to_string(),
            sold: "2024/05/01 00:00:00".to_string(),
        };

        assert_eq!(err.field(), Field::Time);
        assert!(!err.is_format());
    }

    #[test]
    fn test_extraction_error_converts_into_run_error() {
        let err: Error = ExtractionError::missing(Field::Title, "no node").into();
        assert_eq!(err.to_string(), "field 'title' not found: no node");
    }
}
