//! Error taxonomy shared by the poller, the dispatcher and the uploader.
//!
//! Only [`Error::Configuration`] ever escapes `poll` or `dispatch_all`; every
//! other variant is recorded into a [`crate::ResultEnvelope`] as its message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The caller broke a precondition, e.g. an empty batch or a malformed target
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connection failure, timeout, or any other network level problem
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non 2xx status
    #[error("request failed with status: {0}")]
    HttpStatus(u16),

    /// The body was not valid JSON for the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

/// Reasons a file upload is refused, either locally before sending or by the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error(
        "invalid file type, please select one of the following file types: {}",
        .allowed.join(",")
    )]
    TypeNotAllowed { content_type: String, allowed: Vec<String> },

    #[error(
        "file type {content_type} is not accepted, rejected types are: {}",
        .rejected.join(",")
    )]
    TypeRejected { content_type: String, rejected: Vec<String> },

    #[error("maximum file size is {max_mb} MB")]
    TooLarge { size: u64, max_mb: u64 },

    #[error("minimum file size is {min_mb} MB")]
    TooSmall { size: u64, min_mb: u64 },

    #[error("failed to read file: {0}")]
    Read(String),

    #[error("failed to upload file: status {0}")]
    Failed(u16),
}
