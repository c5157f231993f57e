//! Write-ahead operation log.
//!
//! One JSON record per job in the WAL directory. A job is durable on disk
//! before the first mutation, and each completed operation is durable before
//! the next one starts. Complete jobs are archived and deleted; anything left
//! behind is an interrupted job and is offered for recovery.
use thiserror::Error;

pub mod journal;
pub mod recovery;

pub use journal::{plan_entries, Journal};
pub use recovery::Replay;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("folder {folder} is already being organized by job {job_id}")]
    ConcurrentJob { job_id: String, folder: String },
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("journal write failed: {0}")]
    Durability(String),
    #[error("corrupt journal {job_id}: {msg}")]
    Corrupt { job_id: String, msg: String },
    #[error("invalid journal request: {0}")]
    Invalid(String),
    #[error("locking: {0}")]
    Locking(String),
}

pub type Result<T> = std::result::Result<T, WalError>;
