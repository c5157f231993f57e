//! Shared crate-wide constants for tidyard.
//!
//! Centralizes file names, limits and default labels used across modules.
//! Adjusting these here will propagate through the crate.

/// Default logical tag used for naming backup artifacts created during undo.
/// Example filename: `.<name>.<tag>.<millis>.bak`.
pub const DEFAULT_BACKUP_TAG: &str = "tidyard";

/// Temporary filename suffix used for durable JSON writes.
/// The temporary name is constructed as `.{fname}.{pid}.{ctr}{TMP_SUFFIX}`.
pub const TMP_SUFFIX: &str = ".tidyard.tmp";

/// Poll interval in milliseconds for the file-backed lock manager (see `adapters/lock/file.rs`).
pub const LOCK_POLL_MS: u64 = 25;

/// Default lock timeout used by `Tidyard::new()` unless overridden by `with_lock_timeout_ms()`.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// UUIDv5 namespace tag for deterministic plan and operation IDs.
pub const NS_TAG: &str = "https://tidyard.dev/organize";

/// Streaming buffer size used when hashing file content.
pub const CHECKSUM_BUF_SIZE: usize = 8 * 1024;

/// Maximum number of sessions retained per organized folder.
pub const MAX_SESSIONS_PER_FOLDER: usize = 10;

/// Current on-disk schema version for WAL job records.
pub const WAL_SCHEMA_VERSION: u32 = 1;

/// Current on-disk schema version for history files and the folder index.
pub const HISTORY_SCHEMA_VERSION: u32 = 2;

/// Suffix of a WAL job record: `<job_id>.wal.json`.
pub const WAL_FILE_SUFFIX: &str = ".wal.json";

/// Lock file guarding WAL check-and-create, placed inside the WAL directory.
pub const WAL_LOCK_FILE: &str = ".wal.lock";

/// Suffix of a per-folder history file: `<folder_hash>.history.json`.
pub const HISTORY_FILE_SUFFIX: &str = ".history.json";

/// Name of the history index listing organized folders.
pub const HISTORY_INDEX_FILE: &str = "index.json";

/// Prefix for job ids that were started without a durable WAL record.
pub const LOCAL_JOB_PREFIX: &str = "local-";

/// Prefix for WAL jobs that drive an undo session.
pub const UNDO_JOB_PREFIX: &str = "undo-";

/// Environment variable overriding the default store root.
pub const HOME_ENV: &str = "TIDYARD_HOME";

/// Directory name used under the platform config dir when no override is present.
pub const APP_DIR_NAME: &str = "tidyard";

/// Number of entries between two `indexing_progress` events.
pub const INDEX_PROGRESS_EVERY: usize = 64;

/// Paths that are never organized, together with the prefixes that remain allowed underneath.
/// `/var` and `/private` are protected while temp folders beneath them stay usable.
pub const PROTECTED_ROOTS: &[&str] = &[
    "/", "/bin", "/boot", "/dev", "/etc", "/lib", "/lib64", "/opt", "/proc", "/run",
    "/sbin", "/sys", "/usr", "/var", "/System", "/Library", "/Applications", "/private",
];

pub const ALLOWED_PREFIXES: &[&str] = &[
    "/Users/",
    "/home/",
    "/var/folders/",
    "/private/var/folders/",
    "/tmp/",
    "/private/tmp/",
];
