//! Error types for archive parsing and payload decoding.
//!
//! Failures fall into five groups so callers can tell "not an archive",
//! "corrupt archive" and "unsupported feature" apart:
//!
//! - [`Error::Format`]: bad magic or signature, truncated index metadata
//! - [`Error::Io`]: failed reads and missing files
//! - [`Error::Decode`]: a decompression primitive reported failure
//! - [`Error::Unsupported`]: unknown compression method
//! - [`Error::Precondition`]: an operation was called on an invalid container

use thiserror::Error;

use crate::codec::CompressionMethod;
use crate::container::ArchiveFormat;

/// The error type for all archive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The archive is not recognized, or its index metadata is corrupt.
    ///
    /// `format` is `None` when no known format matched at all.
    #[error("{archive}: {}: {reason}", describe_format(.format))]
    Format {
        archive: String,
        format: Option<ArchiveFormat>,
        reason: String,
    },

    /// Reading from the underlying file failed or came up short.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A decompression primitive returned a non-success status.
    #[error("failed to decode {method} payload: {reason}")]
    Decode {
        method: CompressionMethod,
        reason: String,
    },

    /// The entry uses a compression method this crate cannot decode.
    #[error("unsupported compression method {0}")]
    Unsupported(u16),

    /// The operation requires a validated container.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

fn describe_format(format: &Option<ArchiveFormat>) -> String {
    match format {
        Some(format) => format!("corrupt {} archive", format),
        None => "not a recognized archive".to_string(),
    }
}

impl Error {
    /// Build a [`Error::Format`] for an archive of known format.
    pub fn corrupt(archive: impl Into<String>, format: ArchiveFormat, reason: impl Into<String>) -> Self {
        Self::Format {
            archive: archive.into(),
            format: Some(format),
            reason: reason.into(),
        }
    }

    /// Build a [`Error::Format`] for a file no format claimed.
    pub fn not_an_archive(archive: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            archive: archive.into(),
            format: None,
            reason: reason.into(),
        }
    }

    /// Classify a failed read of archive metadata. A short read means the
    /// archive is truncated or one of its offsets points past the end.
    pub fn truncated(
        err: std::io::Error,
        archive: impl Into<String>,
        format: ArchiveFormat,
        what: &str,
    ) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::corrupt(archive, format, format!("{} runs past end of file", what))
        } else {
            Self::Io(err)
        }
    }

    pub fn decode(method: CompressionMethod, reason: impl Into<String>) -> Self {
        Self::Decode {
            method,
            reason: reason.into(),
        }
    }
}
