use std::sync::Arc;

/// Phases of a fetch.
///
/// A fetch moves through these in order:
/// Connecting → Downloading → Reconciling → Completed.
/// A failed fetch stops in whichever phase it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// Resolving, connecting and waiting for the response head.
    #[default]
    Connecting,

    /// Streaming the body into staging storage.
    Downloading,

    /// Comparing the staged byte count against the required length.
    Reconciling,

    /// Staging storage sealed and handed to the caller.
    Completed,
}

impl std::fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchPhase::Connecting => write!(f, "Connecting"),
            FetchPhase::Downloading => write!(f, "Downloading"),
            FetchPhase::Reconciling => write!(f, "Reconciling"),
            FetchPhase::Completed => write!(f, "Completed"),
        }
    }
}

/// Snapshot passed to progress callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub phase:           FetchPhase,
    /// Bytes written to staging storage so far.
    pub bytes_staged:    u64,
    /// Ceiling for `bytes_staged`.
    pub required_length: u64,
    /// Content-Length announced by the server, once the response head arrived.
    pub declared_length: Option<u64>,
}

impl Progress {
    pub fn percentage(&self) -> Option<f32> {
        if self.required_length == 0 {
            return None;
        }
        Some((self.bytes_staged as f32 / self.required_length as f32) * 100.0)
    }
}

pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;
