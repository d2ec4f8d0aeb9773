use std::io::SeekFrom;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, ReadBuf};
use tracing::debug;

use crate::{Error, Result};

/// An open staging file accepting writes.
///
/// The handle owns the only descriptor to an unnamed temporary file. It ends
/// in exactly one of two ways: [`seal`](Self::seal) turns it into a read-only
/// [`SealedFile`], while [`discard`](Self::discard) (or dropping it) closes the
/// descriptor and lets the OS release the storage. Both consume the handle.
#[derive(Debug)]
pub struct StagingFile {
    file:          File,
    bytes_written: u64,
}

impl StagingFile {
    /// Create a staging file in the OS temporary directory.
    pub fn create() -> Result<Self> {
        let file = tempfile::tempfile().map_err(|source| Error::Create { source })?;
        debug!("created staging file in the system temp dir");
        Ok(Self::from_std(file))
    }

    /// Create a staging file inside `dir`.
    ///
    /// The file is unlinked (or created without a name) before this returns,
    /// so `dir` never shows an entry for it.
    pub fn create_in(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let file = tempfile::tempfile_in(dir).map_err(|source| Error::Create { source })?;
        debug!("created staging file in {}", dir.display());
        Ok(Self::from_std(file))
    }

    fn from_std(file: std::fs::File) -> Self {
        Self {
            file:          File::from_std(file),
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 { self.bytes_written }

    /// Append `bytes` and advance the byte counter.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|source| Error::Write {
                written: self.bytes_written,
                source,
            })?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Flush, sync and rewind the file, handing back a read-only view.
    ///
    /// On failure the handle is consumed and therefore discarded.
    pub async fn seal(mut self) -> Result<SealedFile> {
        self.file
            .flush()
            .await
            .map_err(|source| Error::Seal { source })?;
        self.file
            .sync_all()
            .await
            .map_err(|source| Error::Seal { source })?;
        self.file
            .seek(SeekFrom::Start(0))
            .await
            .map_err(|source| Error::Seal { source })?;

        debug!("sealed staging file ({} bytes)", self.bytes_written);
        Ok(SealedFile {
            file: self.file,
            len:  self.bytes_written,
        })
    }

    /// Close the descriptor and release the storage.
    pub fn discard(self) {
        debug!("discarding staging file ({} bytes)", self.bytes_written);
        drop(self);
    }
}

/// A sealed staging file: read-only, positioned at offset 0 when handed out.
#[derive(Debug)]
pub struct SealedFile {
    file: File,
    len:  u64,
}

impl SealedFile {
    /// Number of bytes staged before sealing.
    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Move the read position back to the start.
    pub async fn rewind(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .await
            .map_err(|source| Error::Read { source })?;
        Ok(())
    }

    /// Read the whole content, regardless of the current position.
    pub async fn read_all(&mut self) -> Result<Vec<u8>> {
        self.rewind().await?;
        let mut content = Vec::with_capacity(usize::try_from(self.len).unwrap_or(0));
        self.file
            .read_to_end(&mut content)
            .await
            .map_err(|source| Error::Read { source })?;
        Ok(content)
    }

    /// Convert into a blocking `std::fs::File`, keeping the current position.
    pub async fn into_std(self) -> std::fs::File { self.file.into_std().await }

    /// Release the handle. Dropping it has the same effect.
    pub fn close(self) {
        debug!("closing sealed file ({} bytes)", self.len);
        drop(self);
    }
}

impl AsyncRead for SealedFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}
