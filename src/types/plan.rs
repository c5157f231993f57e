use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{Error, ErrorKind, Result};
use super::ids;

/// One filesystem mutation. Serialized with a `type` tag so journal and
/// history records stay readable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    CreateFolder {
        path: PathBuf,
    },
    Move {
        source: PathBuf,
        destination: PathBuf,
    },
    Rename {
        path: PathBuf,
        #[serde(rename = "newName")]
        new_name: String,
    },
    Quarantine {
        path: PathBuf,
        #[serde(rename = "quarantinePath")]
        quarantine_path: PathBuf,
    },
    Copy {
        source: PathBuf,
        destination: PathBuf,
    },
    DeleteFolder {
        path: PathBuf,
    },
}

impl Operation {
    /// Operation that reverts `self` when applied after it.
    ///
    /// # Errors
    /// Returns `InvalidPath` when a path has no parent or no final component.
    pub fn inverse(&self) -> Result<Operation> {
        Ok(match self {
            Operation::CreateFolder { path } => Operation::DeleteFolder { path: path.clone() },
            Operation::Move {
                source,
                destination,
            } => Operation::Move {
                source: destination.clone(),
                destination: source.clone(),
            },
            Operation::Rename { path, new_name } => {
                let parent = parent_of(path)?;
                let old_name = file_name_of(path)?;
                Operation::Rename {
                    path: parent.join(new_name),
                    new_name: old_name,
                }
            }
            Operation::Quarantine {
                path,
                quarantine_path,
            } => Operation::Move {
                source: quarantine_path.clone(),
                destination: path.clone(),
            },
            Operation::Copy { destination, .. } => Operation::DeleteFolder {
                path: destination.clone(),
            },
            Operation::DeleteFolder { path } => Operation::CreateFolder { path: path.clone() },
        })
    }

    /// Path that has to exist before the operation runs, if any.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Operation::CreateFolder { .. } => None,
            Operation::Move { source, .. } | Operation::Copy { source, .. } => Some(source),
            Operation::Rename { path, .. }
            | Operation::Quarantine { path, .. }
            | Operation::DeleteFolder { path } => Some(path),
        }
    }

    /// Path that holds the operation's result once it ran, if any.
    #[must_use]
    pub fn result_path(&self) -> Option<PathBuf> {
        match self {
            Operation::CreateFolder { path } => Some(path.clone()),
            Operation::Move { destination, .. } | Operation::Copy { destination, .. } => {
                Some(destination.clone())
            }
            Operation::Rename { path, new_name } => {
                path.parent().map(|parent| parent.join(new_name))
            }
            Operation::Quarantine {
                quarantine_path, ..
            } => Some(quarantine_path.clone()),
            Operation::DeleteFolder { .. } => None,
        }
    }

    /// Whether the source stops existing at its old location.
    #[must_use]
    pub const fn removes_source(&self) -> bool {
        matches!(
            self,
            Operation::Move { .. }
                | Operation::Rename { .. }
                | Operation::Quarantine { .. }
                | Operation::DeleteFolder { .. }
        )
    }

    /// Short label used in facts and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Operation::CreateFolder { .. } => "create_folder",
            Operation::Move { .. } => "move",
            Operation::Rename { .. } => "rename",
            Operation::Quarantine { .. } => "quarantine",
            Operation::Copy { .. } => "copy",
            Operation::DeleteFolder { .. } => "delete_folder",
        }
    }

    /// Every path the operation reads or writes.
    #[must_use]
    pub fn touched_paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(2);
        if let Some(src) = self.source_path() {
            out.push(src.to_path_buf());
        }
        if let Some(res) = self.result_path() {
            out.push(res);
        }
        out
    }
}

fn parent_of(path: &Path) -> Result<PathBuf> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::new(ErrorKind::InvalidPath, format!("no parent: {}", path.display())))
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidPath,
                format!("no file name: {}", path.display()),
            )
        })
}

/// Whether a planned entry is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

fn default_enabled() -> bool {
    true
}

/// An operation as it appears inside a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedOperation {
    pub op_id: String,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl PlannedOperation {
    #[must_use]
    pub fn new(op_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            op_id: op_id.into(),
            operation,
            kind: None,
            enabled: true,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// An ordered batch of operations targeting one folder tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizePlan {
    pub plan_id: String,
    pub target_folder: PathBuf,
    pub description: String,
    pub operations: Vec<PlannedOperation>,
}

impl OrganizePlan {
    /// Build a plan whose plan id and operation ids are derived from its content.
    #[must_use]
    pub fn new(
        target_folder: impl Into<PathBuf>,
        description: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        let target_folder = target_folder.into();
        let pid = ids::plan_id(&target_folder, &operations);
        let operations = operations
            .into_iter()
            .enumerate()
            .map(|(idx, op)| {
                let oid = ids::operation_id(&pid, &op, idx);
                PlannedOperation::new(oid.to_string(), op)
            })
            .collect();
        Self {
            plan_id: pid.to_string(),
            target_folder,
            description: description.into(),
            operations,
        }
    }

    /// Operations that will actually run, in plan order.
    pub fn enabled(&self) -> impl Iterator<Item = &PlannedOperation> {
        self.operations.iter().filter(|p| p.enabled)
    }

    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }
}
