//! Non-fatal diagnostics raised while fetching.
//!
//! Length disagreements that do not fail a download are reported through a
//! [`DiagnosticSink`] handed to the fetcher, so callers decide where they go.
//! [`TracingSink`] is the default and logs them with `tracing`.

use std::sync::Mutex;

use tracing::warn;

/// A condition worth reporting that does not fail the download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The server's Content-Length differs from the required length.
    DeclaredLengthMismatch {
        url:      String,
        declared: u64,
        required: u64,
    },

    /// Lenient mode accepted fewer bytes than required.
    Shortfall {
        url:      String,
        required: u64,
        received: u64,
    },

    /// The average transfer speed fell below the configured minimum.
    SlowRetrieval {
        url:         String,
        received:    u64,
        average_bps: u64,
    },
}

pub trait DiagnosticSink: Send + Sync {
    fn notice(&self, notice: Notice);
}

/// Forwards every notice to `tracing::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn notice(&self, notice: Notice) {
        match notice {
            Notice::DeclaredLengthMismatch {
                url,
                declared,
                required,
            } => warn!(
                %url,
                declared, required, "server-declared length differs from required length"
            ),
            Notice::Shortfall {
                url,
                required,
                received,
            } => warn!(
                %url,
                required, received, "accepted a shorter download than required"
            ),
            Notice::SlowRetrieval {
                url,
                received,
                average_bps,
            } => warn!(
                %url,
                received, average_bps, "average download speed below the configured minimum"
            ),
        }
    }
}

/// Keeps notices in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn new() -> Self { Self::default() }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool { self.notices().is_empty() }
}

impl DiagnosticSink for RecordingSink {
    fn notice(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
