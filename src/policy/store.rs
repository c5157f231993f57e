use std::path::{Path, PathBuf};

use crate::constants::{APP_DIR_NAME, HOME_ENV};
use crate::types::errors::{Error, ErrorKind, Result};

/// Where journals, history and quarantined items live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorePaths {
    pub root: PathBuf,
    pub wal_dir: PathBuf,
    pub history_dir: PathBuf,
    pub quarantine_dir: PathBuf,
}

impl StorePaths {
    /// Standard layout beneath `root`.
    #[must_use]
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            wal_dir: root.join("wal"),
            history_dir: root.join("history"),
            quarantine_dir: root.join("quarantine"),
            root,
        }
    }

    /// `$TIDYARD_HOME`, else `<config dir>/tidyard`.
    ///
    /// # Errors
    /// `NotFound` when neither the variable nor a platform config dir is available.
    pub fn from_env() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::under(PathBuf::from(home)));
        }
        dirs::config_dir()
            .map(|d| Self::under(d.join(APP_DIR_NAME)))
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "no config directory for this platform"))
    }

    /// Create all store directories.
    ///
    /// # Errors
    /// Returns an IO error if a directory cannot be created.
    pub fn ensure(&self) -> Result<()> {
        for d in [&self.wal_dir, &self.history_dir, &self.quarantine_dir] {
            std::fs::create_dir_all(d)?;
        }
        Ok(())
    }
}
