use http::HeaderMap;

use crate::core::get_declared_length;
use crate::data::Scheme;

/// What the fetcher learned from the response head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub status:          u16,
    /// Size announced by the server. Informational only.
    pub declared_length: Option<u64>,
    pub scheme:          Scheme,
    /// URL the body was served from, after redirects.
    pub url:             String,
}

impl ResponseMetadata {
    pub fn new(status: u16, scheme: Scheme, url: impl Into<String>) -> Self {
        Self {
            status,
            declared_length: None,
            scheme,
            url: url.into(),
        }
    }

    pub fn from_headers(status: u16, scheme: Scheme, url: impl Into<String>, headers: &HeaderMap) -> Self {
        Self::new(status, scheme, url).with_declared_length(get_declared_length(headers))
    }

    #[must_use]
    pub fn with_declared_length(mut self, declared_length: Option<u64>) -> Self {
        self.declared_length = declared_length;
        self
    }

    pub fn declared_length(&self) -> Option<u64> { self.declared_length }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}
