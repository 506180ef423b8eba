//! Error types for the godeps-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate.
//! The variants are deliberately coarse: callers need to tell *where* an
//! operation failed (acquiring bytes, transporting them, or decoding them) so
//! they can decide whether retrying with a different source or a longer
//! deadline makes sense. Recovery itself is always the caller's concern.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for godeps operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all godeps operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Local source missing or unreadable, detected before any decode attempt
    #[error("cannot open source '{path}': {source}")]
    SourceUnavailable {
        /// Path of the source that could not be opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while reading from an already-opened source
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The remote server answered with a status the reader cannot use
    #[error("HTTP error: {status} {reason}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Status reason phrase
        reason: String,
    },

    /// Connection-level failure talking to the remote server
    #[error("network error: {source}")]
    Network {
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The caller's deadline or cancellation budget fired mid-operation
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The source ended where the decoder still expected bytes
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof {
        /// Absolute offset of the first missing byte
        offset: u64,
    },

    /// No recognizable build-info record, or a record we cannot interpret
    #[error("failed to decode build info: {details}")]
    Decode {
        /// Description of what could not be decoded
        details: String,
    },
}

impl Error {
    /// Creates a new source-unavailable error
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Creates a new HTTP status error
    pub fn http(status: u16, reason: impl Into<String>) -> Self {
        Self::Http {
            status,
            reason: reason.into(),
        }
    }

    /// Creates a new decode error
    pub fn decode(details: impl Into<String>) -> Self {
        Self::Decode {
            details: details.into(),
        }
    }

    /// Creates a new unexpected-EOF error
    pub fn unexpected_eof(offset: u64) -> Self {
        Self::UnexpectedEof { offset }
    }

    /// Maps a `reqwest` failure onto our taxonomy.
    ///
    /// Client-side timeouts count as deadline-exceeded so callers can
    /// distinguish a slow server from an unreachable one.
    pub(crate) fn from_reqwest(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::DeadlineExceeded
        } else {
            Self::Network { source }
        }
    }

    /// Returns true if the operation ran out of its time budget
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    /// Returns true for transport-level failures (HTTP status or connection)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Network { .. })
    }

    /// Returns true if bytes were acquired but could not be decoded
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::UnexpectedEof { .. })
    }
}
