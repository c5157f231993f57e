#![forbid(unsafe_code)]
//! Tidyard: journaled, reversible folder organization.
//!
//! A plan of file operations is previewed in a virtual tree, committed one
//! operation at a time under a write-ahead journal, archived to a per-folder
//! history, and can later be undone with checksum-guarded conflict handling.
//!
//! Safety model highlights:
//! - Every job record is durable before the first mutation, and each completed operation is durable before the next starts.
//! - Each operation re-checks its preconditions right before it runs; a stale plan fails instead of clobbering data.
//! - Undo compares live content against recorded checksums and never overwrites silently.
//! - User files are only touched through the `Mutator` adapter.

pub mod adapters;
pub mod api;
pub mod constants;
pub mod fs;
pub mod history;
pub mod logging;
pub mod phase;
pub mod policy;
pub mod types;
pub mod vfs;
pub mod wal;

pub use api::*;
