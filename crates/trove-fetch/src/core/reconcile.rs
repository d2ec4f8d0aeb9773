use tracing::debug;

use crate::data::TrustMode;
use crate::diagnostics::{DiagnosticSink, Notice};
use crate::error::{FetchError, Result};

/// The facts the reconciler decides on once the body has been drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthCheck {
    pub url:             String,
    pub required_length: u64,
    /// Content-Length from the response head, if any.
    pub declared_length: Option<u64>,
    /// Bytes actually staged.
    pub received:        u64,
    pub mode:            TrustMode,
}

/// Decide whether a drained download is acceptable.
///
/// A declared length that disagrees with the required one is only ever
/// reported. A shortfall fails in [`TrustMode::Strict`] and is reported in
/// [`TrustMode::Lenient`]. `received` cannot exceed `required_length`
/// because the reader stops at the ceiling.
pub fn reconcile(check: &LengthCheck, sink: &dyn DiagnosticSink) -> Result<()> {
    debug_assert!(
        check.received <= check.required_length,
        "reader staged {} bytes past a ceiling of {}",
        check.received,
        check.required_length
    );

    if let Some(declared) = check.declared_length.filter(|&d| d != check.required_length) {
        sink.notice(Notice::DeclaredLengthMismatch {
            url:      check.url.clone(),
            declared,
            required: check.required_length,
        });
    }

    if check.received >= check.required_length {
        debug!(url = %check.url, received = check.received, "download length matches");
        return Ok(());
    }

    match check.mode {
        TrustMode::Strict => Err(FetchError::DownloadLengthMismatch {
            url:      check.url.clone(),
            expected: check.required_length,
            actual:   check.received,
        }),
        TrustMode::Lenient => {
            sink.notice(Notice::Shortfall {
                url:      check.url.clone(),
                required: check.required_length,
                received: check.received,
            });
            Ok(())
        }
    }
}
