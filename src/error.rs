//! Error types for the rebrand pipeline.
//!
//! This module provides the [`Error`] enum which represents every failure
//! mode of a pipeline run, along with a convenient [`Result<T>`] type alias.
//!
//! # Terminal and per-member errors
//!
//! Errors fall into two groups:
//!
//! | Group | Variants | Effect |
//! |-------|----------|--------|
//! | Terminal | [`Fetch`][Error::Fetch], [`SignatureNotFound`][Error::SignatureNotFound], [`MalformedArchive`][Error::MalformedArchive], [`InvalidRule`][Error::InvalidRule], [`InvalidRequest`][Error::InvalidRequest] | The run is aborted |
//! | Per member | [`ManifestParse`][Error::ManifestParse], [`MemberProcessing`][Error::MemberProcessing] | The member is left unmodified |
//!
//! Per-member errors never escape [`rewrite`](crate::rewrite); they are logged
//! and the affected member simply does not appear in the ledger.
//!
//! ```rust
//! use relabel::Error;
//!
//! fn describe(error: &Error) -> &'static str {
//!     match error {
//!         Error::Fetch { .. } => "the store could not be reached",
//!         Error::SignatureNotFound { .. } => "the download is not a packed extension",
//!         Error::MalformedArchive(_) => "the embedded archive is damaged",
//!         _ => "unexpected failure",
//!     }
//! }
//! ```

use std::io;

/// The main error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading or writing local files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A remote resource could not be retrieved.
    ///
    /// Transport failures and non-success status codes are both reported
    /// through this variant. The pipeline never retries.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// No embedded archive was found inside a container.
    ///
    /// Also returned when the archive signature sits at offset 0, which means
    /// the input is a bare archive with no envelope to strip.
    #[error("ZIP signature not found in container ({scanned} bytes scanned)")]
    SignatureNotFound {
        /// Number of bytes examined.
        scanned: usize,
    },

    /// The unwrapped bytes could not be loaded (or written) as a ZIP archive.
    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    /// The manifest member is not a valid JSON object.
    #[error("Invalid manifest: {0}")]
    ManifestParse(String),

    /// A single member could not be processed.
    #[error("Failed to process member '{path}': {reason}")]
    MemberProcessing {
        /// Path of the member inside the archive.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// A replacement rule cannot be used.
    #[error("Invalid replacement rule: {0}")]
    InvalidRule(String),

    /// The inbound request document could not be decoded.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The compression level is outside the valid range (0-9).
    #[error("Invalid compression level {level}, expected 0-9")]
    InvalidCompressionLevel {
        /// The rejected level.
        level: u32,
    },

    /// A member path is unsafe or malformed.
    #[error("Invalid archive path: {0}")]
    InvalidArchivePath(String),

    /// The store listing page did not contain the expected metadata.
    #[error("Store listing error: {0}")]
    StoreListing(String),
}

/// A specialized Result type for pipeline operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Creates a [`Error::Fetch`] from a URL and any displayable reason.
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a [`Error::MemberProcessing`] for the given member.
    pub fn member(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::MemberProcessing {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if this error aborts a whole pipeline run.
    ///
    /// Manifest and member errors are scoped to one member and are absorbed
    /// by the rewrite engine.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Error::ManifestParse(_) | Error::MemberProcessing { .. }
        )
    }

    /// Returns `true` if this is a network or remote failure.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Error::Fetch { .. } | Error::StoreListing(_))
    }

    /// Returns `true` if the input bytes were not in the expected format.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::SignatureNotFound { .. }
                | Error::MalformedArchive(_)
                | Error::InvalidArchivePath(_)
        )
    }

    /// Returns the transport status code used when this error ends a run.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidRule(_)
            | Error::InvalidRequest(_)
            | Error::InvalidCompressionLevel { .. } => 400,
            Error::SignatureNotFound { .. }
            | Error::MalformedArchive(_)
            | Error::InvalidArchivePath(_) => 422,
            Error::Fetch { .. } | Error::StoreListing(_) => 502,
            _ => 500,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::MalformedArchive(format!("I/O error: {e}")),
            other => Error::MalformedArchive(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ManifestParse(err.to_string())
    }
}
