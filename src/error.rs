//! Error taxonomy for YTFS, and its mapping onto POSIX errno at the `fuser`
//! boundary.

use thiserror::Error;

/// Convenient result alias used across the crate.
pub type Result<T> = std::result::Result<T, YtfsError>;

/// Errors produced anywhere in the YTFS stack.
#[derive(Debug, Error)]
pub enum YtfsError {
    /// Invalid path, bad control-file name, or otherwise malformed request.
    #[error("invalid argument")]
    InvalidArgument,

    /// Path or item does not exist.
    #[error("no such file or directory")]
    NotFound,

    /// Operation requires a directory but the target is a file, or vice versa.
    #[error("not a directory")]
    NotADirectory,

    /// Operation requires a file but the target is a directory.
    #[error("is a directory")]
    IsADirectory,

    /// Write or read-write access requested on a read-only filesystem.
    #[error("read-only filesystem")]
    ReadOnly,

    /// Operation not permitted (e.g. mkdir under a result file).
    #[error("operation not permitted")]
    PermissionDenied,

    /// Target of a create-like operation already exists.
    #[error("already exists")]
    AlreadyExists,

    /// File handle does not name a live binding.
    #[error("bad file descriptor")]
    BadHandle,

    /// The remote service returned an empty first page for a new query.
    #[error("search returned no results")]
    NoResults,

    /// A resolver or store operation failed after retries were exhausted,
    /// or the remote service reported a fatal, non-retryable failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// The remote search backend reported the item does not exist.
    #[error("item not available")]
    ItemUnavailable,

    /// The remote search backend response could not be parsed.
    #[error("failed to parse remote response: {0}")]
    ParseError(String),
}

impl YtfsError {
    /// Maps this error onto the POSIX errno `fuser` reply types expect.
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            YtfsError::InvalidArgument => libc::EINVAL,
            YtfsError::NotFound => libc::ENOENT,
            YtfsError::NotADirectory => libc::ENOTDIR,
            YtfsError::IsADirectory => libc::EISDIR,
            YtfsError::ReadOnly => libc::EROFS,
            YtfsError::PermissionDenied => libc::EPERM,
            YtfsError::AlreadyExists => libc::EEXIST,
            YtfsError::BadHandle => libc::EBADF,
            YtfsError::NoResults => libc::EIO,
            YtfsError::Io(_) => libc::EIO,
            YtfsError::ItemUnavailable => libc::ENOENT,
            YtfsError::ParseError(_) => libc::EIO,
        }
    }
}

impl From<std::io::Error> for YtfsError {
    fn from(err: std::io::Error) -> Self {
        YtfsError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for YtfsError {
    fn from(err: reqwest::Error) -> Self {
        YtfsError::Io(err.to_string())
    }
}
