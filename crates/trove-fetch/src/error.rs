//! Error types for trove-fetch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("malformed download request: {0}")]
    Format(String),

    #[error("cannot parse URL {url:?}: {reason}")]
    UrlParsing { url: String, reason: String },

    #[error("unsupported URL scheme {scheme:?} in {url} (only http and https are allowed)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    #[error("timed out talking to {url}")]
    Timeout { url: String },

    #[error("too many redirects from {url} (limit {limit})")]
    TooManyRedirects { url: String, limit: usize },

    #[error("TLS validation failed for {url}: {reason}")]
    SslValidation { url: String, reason: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("downloaded {actual} bytes from {url}, expected {expected}")]
    DownloadLengthMismatch {
        url:      String,
        expected: u64,
        actual:   u64,
    },

    #[error("staging storage error: {0}")]
    Io(#[source] trove_fs::Error),

    #[error("invalid fetch configuration: {0}")]
    Config(String),
}

/// Coarse classification used by callers deciding whether another mirror is worth trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    UrlParsing,
    UnsupportedScheme,
    Connection,
    SslValidation,
    HttpStatus,
    DownloadLengthMismatch,
    Io,
    Config,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Format(_) => ErrorKind::Format,
            FetchError::UrlParsing { .. } => ErrorKind::UrlParsing,
            FetchError::UnsupportedScheme { .. } => ErrorKind::UnsupportedScheme,
            FetchError::Connection { .. }
            | FetchError::Timeout { .. }
            | FetchError::TooManyRedirects { .. } => ErrorKind::Connection,
            FetchError::SslValidation { .. } => ErrorKind::SslValidation,
            FetchError::HttpStatus { .. } => ErrorKind::HttpStatus,
            FetchError::DownloadLengthMismatch { .. } => ErrorKind::DownloadLengthMismatch,
            FetchError::Io(_) => ErrorKind::Io,
            FetchError::Config(_) => ErrorKind::Config,
        }
    }

    /// The HTTP status carried by an [`FetchError::HttpStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<trove_fs::Error> for FetchError {
    fn from(e: trove_fs::Error) -> Self { FetchError::Io(e) }
}

pub type Result<T> = std::result::Result<T, FetchError>;
