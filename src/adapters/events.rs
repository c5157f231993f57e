use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Progress notifications for hosts. Phases are never derived from these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    IndexingProgress {
        root: PathBuf,
        scanned: usize,
        done: bool,
    },
    ExecutionProgress {
        job_id: String,
        op_id: String,
        completed: usize,
        total: usize,
    },
    RollbackProgress {
        job_id: String,
        completed: usize,
        total: usize,
    },
    UndoProgress {
        session_id: String,
        completed: usize,
        total: usize,
    },
    ConflictDetected {
        session_id: String,
        conflicts: usize,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &EngineEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl EventSink for NoopEvents {
    fn emit(&self, _event: &EngineEvent) {}
}

/// Cooperative cancellation, checked between operations.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
