//! Length-bounded, TLS-verified artifact downloads for update clients.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Requests, options and response metadata
//! - `core` - Pure transformations (URL validation, length budget, reconciliation)
//! - `effects` - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Hard ceiling**: never stages more than the caller's required length,
//!   whatever the server announces or sends
//! - **One path, two modes**: [`safe_download`] and [`unsafe_download`] share
//!   validation and transport verification, and differ only in how a short
//!   download is treated
//! - **Mandatory verification**: certificate chain and hostname are always checked
//! - **Anonymous staging**: content lands in an unnamed temporary file that
//!   disappears when dropped
//!
//! # Examples
//!
//! ```no_run
//! # async fn run() -> trove_fetch::Result<()> {
//! let mut staged = trove_fetch::safe_download("https://mirror.example/targets/a.tgz", 1024).await?;
//! let content = staged.read_all().await?;
//! assert_eq!(content.len(), 1024);
//! # Ok(())
//! # }
//! ```

mod core;
mod data;
mod diagnostics;
mod effects;
mod error;

pub use self::core::{LengthCheck, admit, average_speed, below_minimum, get_declared_length, reconcile, validate_url};
pub use data::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS, DEFAULT_READ_TIMEOUT,
    DEFAULT_SLOW_START_GRACE, DownloadRequest, ENV_CA_BUNDLE, ENV_CHUNK_SIZE, ENV_CONNECT_TIMEOUT_SECS,
    ENV_READ_TIMEOUT_SECS, ENV_STAGING_DIR, FetchConfig, FetchOptions, FetchPhase, Progress, ProgressCallback,
    RequiredLength, ResponseMetadata, Scheme, TrustMode, ValidatedUrl,
};
pub use diagnostics::{DiagnosticSink, Notice, RecordingSink, TracingSink};
pub use effects::{BoxStream, Fetcher, HttpClient, OpenResponse, StagedDownload};
#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;
pub use error::{ErrorKind, FetchError, Result};
pub use trove_fs::SealedFile;

/// Download exactly `required_length` bytes from `url`.
///
/// Use this when the length comes from signed metadata. Fewer bytes fail
/// with [`FetchError::DownloadLengthMismatch`]; more are never read.
/// Options come from [`FetchOptions::from_env`].
#[cfg(feature = "reqwest")]
pub async fn safe_download(url: &str, required_length: u64) -> Result<StagedDownload> {
    Fetcher::from_env()?
        .safe_download(url, required_length)
        .await
}

/// Download at most `required_length` bytes from `url`.
///
/// Use this when the length is only an upper bound, such as for the first
/// root metadata file. Fewer bytes are accepted and reported as a
/// [`Notice::Shortfall`]. Transport verification is identical to
/// [`safe_download`].
#[cfg(feature = "reqwest")]
pub async fn unsafe_download(url: &str, required_length: u64) -> Result<StagedDownload> {
    Fetcher::from_env()?
        .unsafe_download(url, required_length)
        .await
}
