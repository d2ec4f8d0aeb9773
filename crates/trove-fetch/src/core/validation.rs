use url::Url;

use crate::data::{Scheme, ValidatedUrl};
use crate::error::{FetchError, Result};

/// Check that `url` is something the fetcher may connect to.
///
/// The scheme is checked before the host, so `file:///etc/passwd` fails
/// with [`FetchError::UnsupportedScheme`] rather than a parse error.
///
/// # Examples
///
/// ```
/// use trove_fetch::{FetchError, validate_url};
///
/// let url = validate_url("https://mirror.example/targets/a.tgz").unwrap();
/// assert_eq!(url.host(), "mirror.example");
///
/// assert!(matches!(
///     validate_url("file:///etc/passwd"),
///     Err(FetchError::UnsupportedScheme { .. })
/// ));
/// ```
pub fn validate_url(url: &str) -> Result<ValidatedUrl> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(FetchError::Format("URL must not be empty".into()));
    }

    let parsed = Url::parse(trimmed).map_err(|e| FetchError::UrlParsing {
        url:    trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = Scheme::from_scheme(parsed.scheme()).ok_or_else(|| FetchError::UnsupportedScheme {
        url:    trimmed.to_string(),
        scheme: parsed.scheme().to_string(),
    })?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(ValidatedUrl::new(parsed, scheme)),
        _ => Err(FetchError::UrlParsing {
            url:    trimmed.to_string(),
            reason: "URL has no host".into(),
        }),
    }
}
