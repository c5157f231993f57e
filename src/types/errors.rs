//! Error types used across tidyard.
use std::path::PathBuf;

use thiserror::Error;

/// High-level error categories for type-level operations and adapters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("invalid path")]
    InvalidPath,
    #[error("io error")]
    Io,
    #[error("policy violation")]
    Policy,
    #[error("not found")]
    NotFound,
    #[error("corrupt record")]
    Corrupt,
}

/// Structured error with a kind and human message.
#[derive(Debug, Error)]
#[error("{kind:?}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        let kind = match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::InvalidData => ErrorKind::Corrupt,
            _ => ErrorKind::Io,
        };
        Error {
            kind,
            msg: e.to_string(),
        }
    }
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A precondition that failed right before a mutation would have run.
///
/// Reported by the execution loop, resume, rollback and plan validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("source missing: {0}")]
    SourceMissing(PathBuf),
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("parent folder missing: {0}")]
    ParentMissing(PathBuf),
    #[error("cannot move {from} into itself ({destination})")]
    Cycle {
        from: PathBuf,
        destination: PathBuf,
    },
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("protected path: {0}")]
    ProtectedPath(PathBuf),
    #[error("symlink loop at {0}")]
    SymlinkLoop(PathBuf),
    #[error("outside target folder: {0}")]
    OutsideScope(PathBuf),
    #[error("invalid name: {0}")]
    InvalidName(String),
}
