use http::HeaderMap;
use http::header::CONTENT_LENGTH;

/// The body size the server announced in `Content-Length`.
///
/// Returns `None` rather than failing when the header is absent, not a
/// non-negative integer, or repeated with different values. The value is
/// informational only and never bounds a download.
///
/// # Examples
///
/// ```
/// use http::{HeaderMap, HeaderValue, header::CONTENT_LENGTH};
/// use trove_fetch::get_declared_length;
///
/// let mut headers = HeaderMap::new();
/// assert_eq!(get_declared_length(&headers), None);
///
/// headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1024"));
/// assert_eq!(get_declared_length(&headers), Some(1024));
/// ```
pub fn get_declared_length(headers: &HeaderMap) -> Option<u64> {
    let mut declared = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        // A single header may also carry a comma-separated list.
        for part in value.to_str().ok()?.split(',') {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let length: u64 = part.parse().ok()?;
            match declared {
                Some(previous) if previous != length => return None,
                _ => declared = Some(length),
            }
        }
    }
    declared
}
