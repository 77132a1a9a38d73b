//! Error types for the correction service

use std::fmt;
use std::io;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a request and the stats file
#[derive(Debug)]
pub enum Error {
    /// The stats document could not be read or written
    StorageUnavailable(io::Error),

    /// The stats document is not in the expected shape
    CorruptDocument(serde_json::Error),

    /// Request body is not a JSON object, or `text` is not a string
    InvalidRequestBody(String),

    /// A page template failed to register or render
    Template(String),

    /// Invalid rule table or startup setting
    Config(String),
}

impl Error {
    /// Whether the caller, rather than the server, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequestBody(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StorageUnavailable(e) => write!(f, "Storage unavailable: {}", e),
            Error::CorruptDocument(e) => write!(f, "Corrupt stats document: {}", e),
            Error::InvalidRequestBody(msg) => write!(f, "Invalid request body: {}", msg),
            Error::Template(msg) => write!(f, "Template error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StorageUnavailable(e) => Some(e),
            Error::CorruptDocument(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::StorageUnavailable(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptDocument(err)
    }
}
