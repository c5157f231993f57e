//! Session phase, computed from sub-states.
//!
//! Hosts never store a phase. They update the three sub-states and ask for
//! the phase, so overlapping signals always resolve the same way.
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingInstruction,
    Indexing,
    Planning,
    Simulation,
    Review,
    Committing,
    RollingBack,
    Complete,
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanState {
    pub awaiting_instruction: bool,
    pub analyzing: bool,
    /// Entries scanned so far while analyzing, when a scan is running.
    pub indexing_progress: Option<usize>,
    pub analysis_error: Option<String>,
    pub has_plan: bool,
    pub preview_built: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecOutcome {
    Complete,
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecState {
    pub executing: bool,
    pub outcome: Option<ExecOutcome>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryState {
    pub rolling_back: bool,
}

/// Resolve the phase. Earlier checks win.
#[must_use]
pub fn compute_phase(plan: &PlanState, exec: &ExecState, recovery: &RecoveryState) -> Phase {
    if recovery.rolling_back {
        return Phase::RollingBack;
    }
    if exec.executing {
        return Phase::Committing;
    }
    if plan.analyzing {
        return if plan.indexing_progress.is_some() {
            Phase::Indexing
        } else {
            Phase::Planning
        };
    }
    if plan.has_plan {
        return if plan.preview_built {
            Phase::Review
        } else {
            Phase::Simulation
        };
    }
    if plan.awaiting_instruction {
        return Phase::AwaitingInstruction;
    }
    if plan.analysis_error.is_some() {
        return Phase::Failed;
    }
    match exec.outcome {
        Some(ExecOutcome::Failed) => Phase::Failed,
        Some(ExecOutcome::Complete) => Phase::Complete,
        None => Phase::Idle,
    }
}

/// Sub-states of one organize session with the transitions hosts drive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub plan: PlanState,
    pub exec: ExecState,
    pub recovery: RecoveryState,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        compute_phase(&self.plan, &self.exec, &self.recovery)
    }

    pub fn await_instruction(&mut self) {
        self.plan = PlanState {
            awaiting_instruction: true,
            ..PlanState::default()
        };
        self.exec.outcome = None;
    }

    pub fn begin_analysis(&mut self) {
        self.plan.analyzing = true;
        self.plan.analysis_error = None;
        self.plan.indexing_progress = None;
        self.exec.outcome = None;
    }

    pub fn indexing_progress(&mut self, scanned: usize) {
        self.plan.indexing_progress = Some(scanned);
    }

    pub fn indexing_done(&mut self) {
        self.plan.indexing_progress = None;
    }

    pub fn analysis_failed(&mut self, error: impl Into<String>) {
        self.plan.analyzing = false;
        self.plan.indexing_progress = None;
        self.plan.awaiting_instruction = false;
        self.plan.has_plan = false;
        self.plan.analysis_error = Some(error.into());
    }

    pub fn plan_ready(&mut self) {
        self.plan.analyzing = false;
        self.plan.indexing_progress = None;
        self.plan.awaiting_instruction = false;
        self.plan.has_plan = true;
        self.plan.preview_built = false;
    }

    pub fn preview_built(&mut self) {
        self.plan.preview_built = self.plan.has_plan;
    }

    pub fn begin_commit(&mut self) {
        self.exec.executing = true;
        self.exec.outcome = None;
    }

    /// The plan is consumed either way; a failed commit leaves recovery to the WAL.
    pub fn finish_commit(&mut self, success: bool) {
        self.exec.executing = false;
        self.exec.outcome = Some(if success {
            ExecOutcome::Complete
        } else {
            ExecOutcome::Failed
        });
        self.plan = PlanState::default();
    }

    pub fn begin_rollback(&mut self) {
        self.recovery.rolling_back = true;
    }

    pub fn finish_rollback(&mut self, success: bool) {
        self.recovery.rolling_back = false;
        self.exec.executing = false;
        self.exec.outcome = if success { None } else { Some(ExecOutcome::Failed) };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
