//! Shared test helpers for the tidyard integration tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::Level;
use serde_json::Value;

use tidyard::adapters::{EngineEvent, EventSink, Mutator, StdMutator};
use tidyard::logging::{AuditSink, FactsEmitter};
use tidyard::policy::{Policy, StorePaths};
use tidyard::types::Operation;
use tidyard::Tidyard;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// Fields of every fact emitted for `stage` with `decision`.
    pub fn find(&self, stage: &str, decision: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e, d, _)| e == stage && d == decision)
            .map(|(_, _, _, f)| f.clone())
            .collect()
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// Captures engine progress events.
#[derive(Clone, Default)]
pub struct TestEvents {
    pub events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl EventSink for TestEvents {
    fn emit(&self, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Forwards to the real mutator, but fails the N-th call (1-based) before touching disk.
/// Counts every call so tests can assert how many operations ran.
#[derive(Clone, Default)]
pub struct FailOnNth {
    pub fail_at: Option<usize>,
    pub calls: Arc<AtomicUsize>,
}

impl FailOnNth {
    pub fn at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            calls: Arc::default(),
        }
    }

    pub fn counting() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Mutator for FailOnNth {
    fn apply(&self, op: &Operation) -> std::io::Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(n) {
            return Err(std::io::Error::other("injected failure"));
        }
        StdMutator.apply(op)
    }
}

/// A per-test root holding a folder to organize and a separate store.
#[derive(Debug)]
pub struct TestRoot {
    td: tempfile::TempDir,
}

impl TestRoot {
    pub fn new() -> Self {
        let td = tempfile::TempDir::new().expect("tempdir");
        std::fs::create_dir_all(td.path().join("A")).unwrap();
        Self { td }
    }

    /// Canonical path of the folder being organized.
    pub fn folder(&self) -> PathBuf {
        std::fs::canonicalize(self.td.path().join("A")).unwrap()
    }

    pub fn join<P: AsRef<Path>>(&self, p: P) -> PathBuf {
        self.folder().join(p)
    }

    pub fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let p = self.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(&p, content).unwrap();
        p
    }

    pub fn store(&self) -> StorePaths {
        StorePaths::under(self.td.path().join("store"))
    }
}

pub fn test_policy() -> Policy {
    let mut policy = Policy::default();
    policy.durability.fsync = false;
    policy
}

/// Engine over `root`'s store with the default mutator.
pub fn engine(root: &TestRoot) -> Tidyard<TestEmitter, TestAudit> {
    Tidyard::new(TestEmitter::default(), TestAudit, test_policy(), root.store())
}

/// Engine that shares `facts` with the caller and routes mutations through `mutator`.
pub fn engine_with(
    root: &TestRoot,
    facts: TestEmitter,
    mutator: FailOnNth,
) -> Tidyard<TestEmitter, TestAudit> {
    Tidyard::new(facts, TestAudit, test_policy(), root.store()).with_mutator(Box::new(mutator))
}
