//! Exit codes for the CLI tool.

use relabel::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Nothing was modified
pub const WARNING: i32 = 1;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Container or archive format error
pub const BAD_CONTAINER: i32 = 3;
/// Remote resource unavailable
pub const FETCH_ERROR: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Invalid command line arguments or request
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Warning,
    FatalError,
    BadContainer,
    FetchError,
    IoError,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::Warning => WARNING,
            Self::FatalError => FATAL_ERROR,
            Self::BadContainer => BAD_CONTAINER,
            Self::FetchError => FETCH_ERROR,
            Self::IoError => IO_ERROR,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a relabel error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::Fetch { .. } | Error::StoreListing(_) => ExitCode::FetchError,
        Error::SignatureNotFound { .. } | Error::MalformedArchive(_) => ExitCode::BadContainer,
        Error::InvalidArchivePath(_) => ExitCode::BadContainer,
        Error::InvalidRule(_) | Error::InvalidRequest(_) => ExitCode::BadArgs,
        Error::InvalidCompressionLevel { .. } => ExitCode::BadArgs,
        Error::ManifestParse(_) | Error::MemberProcessing { .. } => ExitCode::FatalError,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
