use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::data::{Progress, ProgressCallback};
use crate::error::{FetchError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_SLOW_START_GRACE: Duration = Duration::from_secs(3);

/// Configuration for fetch operations.
///
/// No option skips certificate or hostname verification. Trust can only be
/// extended with
/// [`add_root_certificate`](Self::add_root_certificate) or narrowed with
/// [`builtin_roots`](Self::builtin_roots).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use trove_fetch::FetchOptions;
///
/// let options = FetchOptions::default()
///     .connect_timeout(Duration::from_secs(5))
///     .read_timeout(Duration::from_secs(10))
///     .chunk_size(4096);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct FetchOptions {
    /// Limit for establishing the connection (TCP and TLS handshake).
    ///
    /// Default: 30s
    pub connect_timeout: Duration,

    /// Limit for each individual read, including waiting for the response
    /// head and every body chunk.
    ///
    /// Default: 30s
    pub read_timeout: Duration,

    /// Largest piece written to staging storage in one call.
    ///
    /// Default: 8 KiB
    pub chunk_size: usize,

    /// Redirects followed before giving up.
    ///
    /// Default: 10
    pub max_redirects: usize,

    pub user_agent: String,

    /// Extra trusted roots, each a PEM bundle.
    pub extra_root_certificates: Vec<Vec<u8>>,

    /// Whether the bundled Mozilla root set is trusted.
    ///
    /// Default: true
    pub builtin_roots: bool,

    /// Whether proxies from the environment are honoured.
    ///
    /// Default: true
    pub system_proxy: bool,

    /// Directory for staging files. `None` uses the OS temp dir.
    pub staging_dir: Option<PathBuf>,

    /// Minimum average speed in bytes per second. Falling below it is
    /// reported, never fatal.
    ///
    /// Default: None
    pub min_average_speed: Option<u64>,

    /// Time before the minimum average speed is checked.
    ///
    /// Default: 3s
    pub slow_start_grace: Duration,

    /// Progress callback invoked on phase changes and after each staged chunk.
    ///
    /// Default: None
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("chunk_size", &self.chunk_size)
            .field("max_redirects", &self.max_redirects)
            .field("user_agent", &self.user_agent)
            .field("extra_root_certificates", &self.extra_root_certificates.len())
            .field("builtin_roots", &self.builtin_roots)
            .field("system_proxy", &self.system_proxy)
            .field("staging_dir", &self.staging_dir)
            .field("min_average_speed", &self.min_average_speed)
            .field("slow_start_grace", &self.slow_start_grace)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout:         DEFAULT_CONNECT_TIMEOUT,
            read_timeout:            DEFAULT_READ_TIMEOUT,
            chunk_size:              DEFAULT_CHUNK_SIZE,
            max_redirects:           DEFAULT_MAX_REDIRECTS,
            user_agent:              concat!("trove/", env!("CARGO_PKG_VERSION")).to_string(),
            extra_root_certificates: Vec::new(),
            builtin_roots:           true,
            system_proxy:            true,
            staging_dir:             None,
            min_average_speed:       None,
            slow_start_grace:        DEFAULT_SLOW_START_GRACE,
            on_progress:             None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Trust the certificates in `pem` in addition to the current roots.
    #[must_use]
    pub fn add_root_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.extra_root_certificates.push(pem.into());
        self
    }

    #[must_use]
    pub fn builtin_roots(mut self, enabled: bool) -> Self {
        self.builtin_roots = enabled;
        self
    }

    #[must_use]
    pub fn system_proxy(mut self, enabled: bool) -> Self {
        self.system_proxy = enabled;
        self
    }

    #[must_use]
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn min_average_speed(mut self, bytes_per_second: Option<u64>) -> Self {
        self.min_average_speed = bytes_per_second;
        self
    }

    #[must_use]
    pub fn slow_start_grace(mut self, grace: Duration) -> Self {
        self.slow_start_grace = grace;
        self
    }

    /// Set the progress callback.
    ///
    /// # Examples
    ///
    /// ```
    /// use trove_fetch::FetchOptions;
    ///
    /// let options = FetchOptions::default().on_progress(|progress| {
    ///     println!("{}: {} bytes", progress.phase, progress.bytes_staged);
    /// });
    /// ```
    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Reject settings the fetcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FetchError::Config("chunk_size must be greater than zero".into()));
        }
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(FetchError::Config("timeouts must be greater than zero".into()));
        }
        if !self.builtin_roots && self.extra_root_certificates.is_empty() {
            return Err(FetchError::Config(
                "builtin roots disabled and no root certificates configured".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn report(&self, progress: Progress) {
        if let Some(ref callback) = self.on_progress {
            callback(&progress);
        }
    }
}
