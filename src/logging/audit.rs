//! Typed emission of audit facts across the engine's stages.
//!
//! Every fact carries a minimal envelope: `schema_version`, `ts`, `job_id`,
//! `plan_id`, `path`, `stage`, `decision`. Redaction is applied centrally.
use serde_json::{json, Map, Value};

use crate::api::errors::{exit_code_for, id_str, ErrorId};
use crate::logging::{redact_event, FactsEmitter};

pub(crate) const SCHEMA_VERSION: i64 = 1;
const SUBSYSTEM: &str = "tidyard";

pub(crate) struct AuditCtx<'a> {
    pub facts: &'a dyn FactsEmitter,
    pub job_id: String,
    pub plan_id: String,
    pub ts: String,
    pub redact: bool,
}

impl<'a> AuditCtx<'a> {
    pub(crate) fn new(
        facts: &'a dyn FactsEmitter,
        job_id: impl Into<String>,
        plan_id: impl Into<String>,
        ts: String,
    ) -> Self {
        Self {
            facts,
            job_id: job_id.into(),
            plan_id: plan_id.into(),
            ts,
            redact: false,
        }
    }
}

/// Stage for typed audit emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Plan,
    Simulate,
    CommitAttempt,
    CommitResult,
    CommitSummary,
    Resume,
    Rollback,
    RollbackSummary,
    UndoPreflight,
    UndoResult,
    History,
    Migration,
}

impl Stage {
    #[must_use]
    pub const fn as_event(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Simulate => "simulate",
            Stage::CommitAttempt => "commit.attempt",
            Stage::CommitResult => "commit.result",
            Stage::CommitSummary => "commit.summary",
            Stage::Resume => "resume",
            Stage::Rollback => "rollback",
            Stage::RollbackSummary => "rollback.summary",
            Stage::UndoPreflight => "undo.preflight",
            Stage::UndoResult => "undo.result",
            Stage::History => "history",
            Stage::Migration => "migration",
        }
    }
}

/// Decision severity for audit events.
#[derive(Clone, Copy, Debug)]
pub enum Decision {
    Success,
    Failure,
    Warn,
}

impl Decision {
    const fn as_str(self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Warn => "warn",
        }
    }
}

/// Builder facade over audit emission with centralized envelope+redaction.
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    pub(crate) fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    pub fn plan(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Plan)
    }
    pub fn simulate(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Simulate)
    }
    pub fn commit_attempt(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::CommitAttempt)
    }
    pub fn commit_result(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::CommitResult)
    }
    pub fn commit_summary(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::CommitSummary)
    }
    pub fn resume(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Resume)
    }
    pub fn rollback(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Rollback)
    }
    pub fn rollback_summary(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::RollbackSummary)
    }
    pub fn undo_preflight(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::UndoPreflight)
    }
    pub fn undo_result(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::UndoResult)
    }
    pub fn history(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::History)
    }
    pub fn migration(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Migration)
    }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    stage: Stage,
    fields: Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, stage: Stage) -> Self {
        let mut fields = Map::new();
        fields.insert("stage".to_string(), json!(stage.as_event()));
        Self { ctx, stage, fields }
    }

    #[must_use]
    pub fn op(mut self, op_id: impl Into<String>) -> Self {
        self.fields.insert("op_id".into(), json!(op_id.into()));
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.fields.insert("path".into(), json!(path.into()));
        self
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn merge(mut self, extra: &Value) -> Self {
        if let Some(obj) = extra.as_object() {
            for (k, v) in obj {
                self.fields.insert(k.clone(), v.clone());
            }
        }
        self
    }

    /// Attach a stable error id and its exit code.
    #[must_use]
    pub fn error_id(mut self, id: ErrorId) -> Self {
        self.fields.insert("error_id".into(), json!(id_str(id)));
        self.fields.insert("exit_code".into(), json!(exit_code_for(id)));
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = self.fields;
        fields
            .entry("decision")
            .or_insert(json!(decision.as_str()));
        redact_and_emit(
            self.ctx,
            self.stage.as_event(),
            decision.as_str(),
            Value::Object(fields),
        );
    }

    pub fn emit_success(self) {
        self.emit(Decision::Success);
    }
    pub fn emit_failure(self) {
        self.emit(Decision::Failure);
    }
    pub fn emit_warn(self) {
        self.emit(Decision::Warn);
    }
}

fn redact_and_emit(ctx: &AuditCtx, event: &str, decision: &str, mut fields: Value) {
    if let Some(obj) = fields.as_object_mut() {
        obj.entry("schema_version").or_insert(json!(SCHEMA_VERSION));
        obj.entry("ts").or_insert(json!(ctx.ts));
        obj.entry("job_id").or_insert(json!(ctx.job_id));
        obj.entry("plan_id").or_insert(json!(ctx.plan_id));
        obj.entry("path").or_insert(json!(""));
    }
    let out = if ctx.redact {
        redact_event(fields)
    } else {
        fields
    };
    ctx.facts.emit(SUBSYSTEM, event, decision, out);
}
