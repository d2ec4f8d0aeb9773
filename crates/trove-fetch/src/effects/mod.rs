//! Everything that touches the network or the filesystem.

mod fetcher;
mod http;
mod reader;

pub use fetcher::{Fetcher, StagedDownload};
pub use http::{BoxStream, HttpClient, OpenResponse};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
