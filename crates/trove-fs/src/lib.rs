//! Private staging storage for downloaded artifacts.
//!
//! A [`StagingFile`] is an unnamed temporary file: it never has a path in the
//! filesystem, so no other process can open it by guessing a name. It is
//! either sealed into a read-only [`SealedFile`] positioned at offset 0, or
//! discarded. Dropping an unsealed handle discards it.

mod error;
mod staging;

pub use error::{Error, Result};
pub use staging::{SealedFile, StagingFile};
