use std::io;
use std::path::PathBuf;

/// Classified cause of a watcher initialization failure.
///
/// The kernel-side notification facility can refuse to come up for a handful
/// of well-known resource reasons; everything else carries the raw OS code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherInitReason {
    /// The per-user limit on notification instances was reached.
    TooManyInstances,
    /// The system-wide open file limit was reached.
    TooManyOpenFiles,
    /// Insufficient kernel memory.
    OutOfKernelMemory,
    /// Any other OS error code (0 when the backend reported no code).
    Other(i32),
}

impl std::fmt::Display for WatcherInitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyInstances => write!(f, "too many watcher instances"),
            Self::TooManyOpenFiles => write!(f, "too many open files"),
            Self::OutOfKernelMemory => write!(f, "out of kernel memory"),
            Self::Other(code) => write!(f, "unexpected error code {code}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("failed to initialize filesystem watcher ({reason}): {source}")]
    WatcherInit {
        reason: WatcherInitReason,
        source: notify::Error,
    },

    #[error("filesystem watcher read failed: {message}")]
    WatcherRead { message: String },

    #[error("path inaccessible: {path}: {source}")]
    PathInaccessible { path: PathBuf, source: io::Error },

    #[error("invalid path: {path}")]
    InvalidPath { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, IndexerError>;

/// Maps a backend initialization error onto the classified reasons.
pub(crate) fn init_reason(error: &notify::Error) -> WatcherInitReason {
    match &error.kind {
        notify::ErrorKind::MaxFilesWatch => WatcherInitReason::TooManyInstances,
        notify::ErrorKind::Io(io_error) => match io_error.raw_os_error() {
            #[cfg(unix)]
            Some(libc::EMFILE) => WatcherInitReason::TooManyInstances,
            #[cfg(unix)]
            Some(libc::ENFILE) => WatcherInitReason::TooManyOpenFiles,
            #[cfg(unix)]
            Some(libc::ENOMEM) => WatcherInitReason::OutOfKernelMemory,
            Some(code) => WatcherInitReason::Other(code),
            None => WatcherInitReason::Other(0),
        },
        _ => WatcherInitReason::Other(0),
    }
}
