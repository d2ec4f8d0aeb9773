use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{FetchError, Result};

/// Transport schemes the fetcher will talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A URL that passed [`validate_url`](crate::validate_url): parsed, with a
/// host and a supported scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    url:    Url,
    scheme: Scheme,
}

impl ValidatedUrl {
    pub(crate) fn new(url: Url, scheme: Scheme) -> Self { Self { url, scheme } }

    pub fn url(&self) -> &Url { &self.url }

    pub fn scheme(&self) -> Scheme { self.scheme }

    pub fn host(&self) -> &str { self.url.host_str().unwrap_or_default() }

    pub fn as_str(&self) -> &str { self.url.as_str() }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.url.as_str()) }
}

/// How the required length is to be trusted.
///
/// Only the treatment of a short download differs between the modes.
/// Transport verification is the same for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustMode {
    /// The length comes from signed metadata; a short download is an error.
    #[default]
    Strict,

    /// The length is an upper bound only; a short download is accepted with a warning.
    Lenient,
}

impl TrustMode {
    pub fn is_strict(&self) -> bool { matches!(self, TrustMode::Strict) }
}

impl fmt::Display for TrustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustMode::Strict => write!(f, "strict"),
            TrustMode::Lenient => write!(f, "lenient"),
        }
    }
}

/// A required length, checked to be a non-negative integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequiredLength(u64);

impl RequiredLength {
    pub fn new(length: u64) -> Self { Self(length) }

    pub fn get(&self) -> u64 { self.0 }
}

impl From<u64> for RequiredLength {
    fn from(length: u64) -> Self { Self(length) }
}

impl TryFrom<i64> for RequiredLength {
    type Error = FetchError;

    fn try_from(length: i64) -> Result<Self> {
        u64::try_from(length)
            .map(Self)
            .map_err(|_| FetchError::Format(format!("required length must be non-negative, got {length}")))
    }
}

impl FromStr for RequiredLength {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| FetchError::Format(format!("required length must be a non-negative integer, got {s:?}")))
    }
}

/// Everything needed for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url:             String,
    pub required_length: u64,
    pub mode:            TrustMode,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, required_length: impl Into<RequiredLength>, mode: TrustMode) -> Self {
        Self {
            url: url.into(),
            required_length: required_length.into().get(),
            mode,
        }
    }

    pub fn strict(url: impl Into<String>, required_length: u64) -> Self {
        Self::new(url, required_length, TrustMode::Strict)
    }

    pub fn lenient(url: impl Into<String>, required_length: u64) -> Self {
        Self::new(url, required_length, TrustMode::Lenient)
    }
}
