//! Error types and exit codes.

use crate::domain::UnreadFile;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exit status of a run.
///
/// - 0: the scan completed, whether or not duplicates were found
/// - 1: a fatal error stopped the run (bad root, unwritable destination, ...)
/// - 130: interrupted by the user (128 + SIGINT)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Interrupted = 130,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Per-file failure while checksumming. Never fatal on its own.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("no such file")]
    NotFound(PathBuf),

    #[error("permission denied")]
    PermissionDenied(PathBuf),

    #[error("not a regular file")]
    NotAFile(PathBuf),

    #[error("{source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("interrupted")]
    Interrupted,
}

impl HashError {
    pub fn from_io(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => HashError::NotFound(path),
            io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path),
            _ => HashError::Io { path, source: err },
        }
    }
}

/// Failure while producing candidate paths.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A directory below the root could not be read; the walk goes on.
    #[error("could not read directory entry: {0}")]
    Walk(ignore::Error),

    #[error("failed to read paths from the input stream")]
    Input(#[source] io::Error),
}

impl SourceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Input(_))
    }

    /// The folder a walk error skipped, so it can be listed with the
    /// unreadable files.
    pub fn unread_folder(&self) -> Option<UnreadFile> {
        let SourceError::Walk(err) = self else {
            return None;
        };
        let path = walk_error_path(err)?.to_path_buf();
        let reason = match err.io_error() {
            Some(io) if io.kind() == io::ErrorKind::PermissionDenied => {
                "permission denied".to_string()
            }
            Some(io) => io.to_string(),
            None => err.to_string(),
        };
        Some(UnreadFile { path, reason })
    }
}

fn walk_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("the archive file {0} does not exist")]
    Missing(PathBuf),

    #[error("{0} already exists and will not be overwritten")]
    Exists(PathBuf),

    #[error("failed to access the archive {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the archive {path} is not valid")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("the archive {path} could not be encoded")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{0} already exists and will not be overwritten")]
    Exists(PathBuf),

    #[error("the folder for {0} does not exist")]
    MissingParent(PathBuf),

    #[error("failed to write the report to {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

/// Anything that ends a run early.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{reason}: {}", .path.display())]
    InvalidRoot { path: PathBuf, reason: &'static str },

    #[error(transparent)]
    Source(SourceError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Output(#[from] OutputError),

    /// The folder being scanned went away mid-run, e.g. an unplugged drive.
    #[error(
        "a previously located file couldn't be located, {} is no longer reachable",
        .root.display()
    )]
    Disconnected { root: PathBuf },

    #[error("the scan was interrupted")]
    Interrupted,
}

impl ScanError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ScanError::Interrupted => ExitCode::Interrupted,
            _ => ExitCode::GeneralError,
        }
    }
}
