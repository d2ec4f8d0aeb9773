use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create staging file: {source}")]
    Create {
        #[source]
        source: io::Error,
    },

    #[error("failed to write to staging file after {written} bytes: {source}")]
    Write {
        written: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to seal staging file: {source}")]
    Seal {
        #[source]
        source: io::Error,
    },

    #[error("failed to read sealed file: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// The underlying I/O error kind, useful for telling a full disk from a permission problem.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Error::Create { source }
            | Error::Write { source, .. }
            | Error::Seal { source }
            | Error::Read { source } => source.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
