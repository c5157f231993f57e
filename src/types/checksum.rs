use serde::{Deserialize, Serialize};

/// Content fingerprint of a path at a point in time.
///
/// Directories carry an identity digest instead of a content digest and a size of 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChecksum {
    pub sha256: String,
    pub size: u64,
    /// Seconds since the Unix epoch. Informational only.
    pub mtime: i64,
    pub is_directory: bool,
}

/// Outcome of comparing a recorded checksum with the live path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumStatus {
    Unchanged,
    Modified,
    Missing,
}
