use thiserror::Error;

use crate::types::errors::PreconditionError;
use crate::wal::WalError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("folder {folder} is already being organized by job {job_id}")]
    ConcurrentJob { job_id: String, folder: String },
    #[error("durability: {0}")]
    Durability(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("stale plan: expected hash {expected}, plan now hashes to {actual}")]
    StalePlan { expected: String, actual: String },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("filesystem error: {0}")]
    Filesystem(String),
    #[error("policy violation: {0}")]
    Policy(String),
    #[error("session {0} was already undone")]
    AlreadyUndone(String),
    #[error("locking timeout: {0}")]
    LockingTimeout(String),
}

impl ApiError {
    /// Stable id for facts and exit codes.
    #[must_use]
    pub const fn id(&self) -> ErrorId {
        match self {
            ApiError::ConcurrentJob { .. } => ErrorId::E_CONCURRENT_JOB,
            ApiError::Durability(_) => ErrorId::E_DURABILITY,
            ApiError::Precondition(_) => ErrorId::E_PRECONDITION,
            ApiError::NotFound(_) => ErrorId::E_NOT_FOUND,
            ApiError::StalePlan { .. } => ErrorId::E_STALE_PLAN,
            ApiError::Protocol(_) => ErrorId::E_PROTOCOL,
            ApiError::Policy(_) | ApiError::AlreadyUndone(_) => ErrorId::E_POLICY,
            ApiError::LockingTimeout(_) => ErrorId::E_LOCKING,
            ApiError::Filesystem(_) => ErrorId::E_GENERIC,
        }
    }
}

/// Best-effort mapping from per-operation error strings to summary error ids.
/// Always ends with a top-level classification.
#[must_use]
pub fn infer_summary_error_ids(errors: &[String]) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    let joined = errors.join("; ").to_lowercase();
    if joined.contains("lock") {
        out.push(id_str(ErrorId::E_LOCKING));
    }
    if joined.contains("journal") {
        out.push(id_str(ErrorId::E_DURABILITY));
    }
    let precondition = [
        "source missing",
        "already exists",
        "parent folder missing",
        "into itself",
        "invalid name",
        "conflict",
    ];
    if precondition.iter().any(|k| joined.contains(k)) {
        out.push(id_str(ErrorId::E_PRECONDITION));
    }
    out.push(id_str(ErrorId::E_GENERIC));
    let mut seen = std::collections::HashSet::new();
    out.into_iter().filter(|id| seen.insert(*id)).collect()
}

impl From<crate::types::errors::Error> for ApiError {
    fn from(e: crate::types::errors::Error) -> Self {
        use crate::types::errors::ErrorKind::{Corrupt, InvalidPath, Io, NotFound, Policy};
        match e.kind {
            InvalidPath | Io | Corrupt => ApiError::Filesystem(e.msg),
            NotFound => ApiError::NotFound(e.msg),
            Policy => ApiError::Policy(e.msg),
        }
    }
}

impl From<WalError> for ApiError {
    fn from(e: WalError) -> Self {
        match e {
            WalError::ConcurrentJob { job_id, folder } => ApiError::ConcurrentJob { job_id, folder },
            WalError::NotFound(id) => ApiError::NotFound(format!("job {id}")),
            WalError::Durability(m) => ApiError::Durability(m),
            e @ WalError::Corrupt { .. } => ApiError::Durability(e.to_string()),
            WalError::Invalid(m) => ApiError::Protocol(m),
            WalError::Locking(m) => ApiError::LockingTimeout(m),
        }
    }
}

impl From<PreconditionError> for ApiError {
    fn from(e: PreconditionError) -> Self {
        match e {
            PreconditionError::ProtectedPath(_) | PreconditionError::OutsideScope(_) => {
                ApiError::Policy(e.to_string())
            }
            other => ApiError::Precondition(other.to_string()),
        }
    }
}

// Stable identifiers emitted in facts; SCREAMING_SNAKE_CASE matches the wire form.
#[allow(non_camel_case_types, reason = "error ids match their emitted form")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_POLICY,
    E_CONCURRENT_JOB,
    E_LOCKING,
    E_DURABILITY,
    E_PRECONDITION,
    E_NOT_FOUND,
    E_STALE_PLAN,
    E_PROTOCOL,
    E_GENERIC,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_POLICY => "E_POLICY",
        ErrorId::E_CONCURRENT_JOB => "E_CONCURRENT_JOB",
        ErrorId::E_LOCKING => "E_LOCKING",
        ErrorId::E_DURABILITY => "E_DURABILITY",
        ErrorId::E_PRECONDITION => "E_PRECONDITION",
        ErrorId::E_NOT_FOUND => "E_NOT_FOUND",
        ErrorId::E_STALE_PLAN => "E_STALE_PLAN",
        ErrorId::E_PROTOCOL => "E_PROTOCOL",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_POLICY => 10,
        ErrorId::E_CONCURRENT_JOB => 20,
        ErrorId::E_LOCKING => 30,
        ErrorId::E_DURABILITY => 40,
        ErrorId::E_PRECONDITION => 50,
        ErrorId::E_NOT_FOUND => 60,
        ErrorId::E_STALE_PLAN => 70,
        ErrorId::E_PROTOCOL => 80,
        ErrorId::E_GENERIC => 1,
    }
}

#[must_use]
pub fn exit_code_for_id_str(s: &str) -> Option<i32> {
    [
        ErrorId::E_POLICY,
        ErrorId::E_CONCURRENT_JOB,
        ErrorId::E_LOCKING,
        ErrorId::E_DURABILITY,
        ErrorId::E_PRECONDITION,
        ErrorId::E_NOT_FOUND,
        ErrorId::E_STALE_PLAN,
        ErrorId::E_PROTOCOL,
        ErrorId::E_GENERIC,
    ]
    .into_iter()
    .find(|id| id_str(*id) == s)
    .map(exit_code_for)
}
