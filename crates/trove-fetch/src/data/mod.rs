//! Plain data passed between the layers: requests, options, response
//! metadata and progress snapshots.

mod config;
mod options;
mod progress;
mod request;
mod response;

pub use config::{
    ENV_CA_BUNDLE, ENV_CHUNK_SIZE, ENV_CONNECT_TIMEOUT_SECS, ENV_READ_TIMEOUT_SECS, ENV_STAGING_DIR,
    FetchConfig,
};
pub use options::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS, DEFAULT_READ_TIMEOUT,
    DEFAULT_SLOW_START_GRACE, FetchOptions,
};
pub use progress::{FetchPhase, Progress, ProgressCallback};
pub use request::{DownloadRequest, RequiredLength, Scheme, TrustMode, ValidatedUrl};
pub use response::ResponseMetadata;
