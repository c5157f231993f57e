use std::path::PathBuf;

use crate::constants::{
    ALLOWED_PREFIXES, DEFAULT_BACKUP_TAG, DEFAULT_LOCK_TIMEOUT_MS, MAX_SESSIONS_PER_FOLDER,
    PROTECTED_ROOTS,
};

/// Which folders may be organized.
#[derive(Clone, Debug)]
pub struct Scope {
    pub protected_roots: Vec<PathBuf>,
    pub allowed_prefixes: Vec<PathBuf>,
    /// Refuse operations whose paths leave the plan's target folder.
    pub confine_to_target: bool,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            protected_roots: PROTECTED_ROOTS.iter().map(PathBuf::from).collect(),
            allowed_prefixes: ALLOWED_PREFIXES.iter().map(PathBuf::from).collect(),
            confine_to_target: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Retention {
    pub max_sessions_per_folder: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            max_sessions_per_folder: MAX_SESSIONS_PER_FOLDER,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Backup {
    pub tag: String,
}

impl Default for Backup {
    fn default() -> Self {
        Self {
            tag: DEFAULT_BACKUP_TAG.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Governance {
    pub lock_timeout_ms: u64,
    /// Allow `start_organize_job_or_local` to hand out a non-durable job id.
    pub allow_local_fallback: bool,
}

impl Default for Governance {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            allow_local_fallback: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Durability {
    /// fsync records and their directories after each write.
    pub fsync: bool,
}

impl Default for Durability {
    fn default() -> Self {
        Self { fsync: true }
    }
}
