use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

/// Every browser-side failure is a session failure to the extraction core.
impl From<Error> for soldlist_core::Error {
    fn from(err: Error) -> Self {
        soldlist_core::Error::Session(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
