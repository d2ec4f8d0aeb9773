use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tracing::debug;
use trove_fs::{SealedFile, StagingFile};

use crate::core::{LengthCheck, reconcile, validate_url};
use crate::data::{DownloadRequest, FetchOptions, FetchPhase, Progress, TrustMode};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::effects::http::HttpClient;
use crate::effects::reader::{DrainContext, drain};
use crate::error::{FetchError, Result};

/// A completed download, sealed in anonymous staging storage.
///
/// The content is read through [`AsyncRead`] (positioned at offset 0) or
/// [`read_all`](Self::read_all). Dropping the value releases the storage;
/// nothing is ever left behind on disk.
#[derive(Debug)]
pub struct StagedDownload {
    file:            SealedFile,
    actual_length:   u64,
    declared_length: Option<u64>,
    url:             String,
}

impl StagedDownload {
    /// Bytes staged. Never more than the required length.
    pub fn actual_length(&self) -> u64 { self.actual_length }

    pub fn len(&self) -> u64 { self.actual_length }

    pub fn is_empty(&self) -> bool { self.actual_length == 0 }

    /// Content-Length announced by the server, for display only.
    pub fn declared_length(&self) -> Option<u64> { self.declared_length }

    /// URL the body came from, after redirects.
    pub fn url(&self) -> &str { &self.url }

    pub async fn rewind(&mut self) -> Result<()> { Ok(self.file.rewind().await?) }

    pub async fn read_all(&mut self) -> Result<Vec<u8>> { Ok(self.file.read_all().await?) }

    pub fn into_file(self) -> SealedFile { self.file }

    /// Release the staging storage. Dropping the value has the same effect.
    pub fn close(self) { self.file.close() }
}

impl AsyncRead for StagedDownload {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

/// Downloads artifacts of a known maximum size into staging storage.
///
/// Both trust modes go through [`fetch`](Self::fetch); they share URL
/// validation, transport verification and the length ceiling, and differ
/// only in how a short download is treated.
pub struct Fetcher<C: HttpClient> {
    pub(crate) client: C,
    options:           FetchOptions,
    sink:              Arc<dyn DiagnosticSink>,
}

impl<C: HttpClient> Fetcher<C> {
    /// Create a fetcher that reports diagnostics through [`TracingSink`].
    pub fn new(client: C, options: FetchOptions) -> Self {
        Self {
            client,
            options,
            sink: Arc::new(TracingSink),
        }
    }

    /// Send non-fatal diagnostics to `sink` instead.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn options(&self) -> &FetchOptions { &self.options }

    /// Download `request.url` into staging storage, reading at most
    /// `request.required_length` bytes.
    ///
    /// Staging storage is discarded on every error path before the error
    /// is returned.
    pub async fn fetch(&self, request: &DownloadRequest) -> Result<StagedDownload> {
        self.options.validate()?;
        let url = validate_url(&request.url)?;
        let required_length = request.required_length;
        debug!("fetching {url} ({} mode, at most {required_length} bytes)", request.mode);

        self.options.report(Progress {
            phase: FetchPhase::Connecting,
            bytes_staged: 0,
            required_length,
            declared_length: None,
        });

        let response = self.client.open(&url).await?;
        let metadata = response.metadata;
        if !metadata.is_success() {
            return Err(FetchError::HttpStatus {
                url:    metadata.url,
                status: metadata.status,
            });
        }
        let declared_length = metadata.declared_length();

        let mut staging = self.create_staging()?;
        self.options.report(Progress {
            phase: FetchPhase::Downloading,
            bytes_staged: 0,
            required_length,
            declared_length,
        });

        let ctx = DrainContext {
            url: &metadata.url,
            options: &self.options,
            sink: self.sink.as_ref(),
            declared_length,
        };
        let outcome = match drain(response.body, required_length, &mut staging, &ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("download of {} failed: {e}", metadata.url);
                staging.discard();
                return Err(e);
            }
        };

        if outcome.truncated {
            debug!("{} sent more than {required_length} bytes; the excess was dropped", metadata.url);
        }
        self.options.report(Progress {
            phase: FetchPhase::Reconciling,
            bytes_staged: outcome.bytes_written,
            required_length,
            declared_length,
        });

        let check = LengthCheck {
            url: metadata.url.clone(),
            required_length,
            declared_length,
            received: outcome.bytes_written,
            mode: request.mode,
        };
        if let Err(e) = reconcile(&check, self.sink.as_ref()) {
            staging.discard();
            return Err(e);
        }

        let file = staging.seal().await?;
        self.options.report(Progress {
            phase: FetchPhase::Completed,
            bytes_staged: outcome.bytes_written,
            required_length,
            declared_length,
        });
        debug!("staged {} bytes from {}", outcome.bytes_written, metadata.url);

        Ok(StagedDownload {
            file,
            actual_length: outcome.bytes_written,
            declared_length,
            url: metadata.url,
        })
    }

    pub async fn download(&self, url: &str, required_length: u64, mode: TrustMode) -> Result<StagedDownload> {
        self.fetch(&DownloadRequest::new(url, required_length, mode))
            .await
    }

    /// Download exactly `required_length` bytes; fewer is an error.
    pub async fn safe_download(&self, url: &str, required_length: u64) -> Result<StagedDownload> {
        self.download(url, required_length, TrustMode::Strict)
            .await
    }

    /// Download at most `required_length` bytes; fewer is accepted with a warning.
    pub async fn unsafe_download(&self, url: &str, required_length: u64) -> Result<StagedDownload> {
        self.download(url, required_length, TrustMode::Lenient)
            .await
    }

    fn create_staging(&self) -> Result<StagingFile> {
        let staging = match self.options.staging_dir {
            Some(ref dir) => StagingFile::create_in(dir)?,
            None => StagingFile::create()?,
        };
        Ok(staging)
    }
}

#[cfg(feature = "reqwest")]
impl Fetcher<crate::effects::http::ReqwestClient> {
    /// Build a fetcher with the production client.
    pub fn from_options(options: FetchOptions) -> Result<Self> {
        let client = crate::effects::http::ReqwestClient::new(&options)?;
        Ok(Self::new(client, options))
    }

    /// Like [`from_options`](Self::from_options) with [`FetchOptions::from_env`].
    pub fn from_env() -> Result<Self> { Self::from_options(FetchOptions::from_env()?) }
}
