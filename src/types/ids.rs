//! Deterministic UUIDv5 identifiers for plans and operations.
//!
//! The UUID namespace is derived from a stable tag (`NS_TAG`) so that
//! `plan_id`, `operation_id` and `plan_hash` are reproducible across runs for
//! the same serialized operation sequence.
use std::fmt::Write;
use std::path::Path;

use uuid::Uuid;

use super::plan::{EntryKind, Operation, OrganizePlan};
use crate::constants::NS_TAG;

fn namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, NS_TAG.as_bytes())
}

fn p(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Serialize an operation into a stable, human-readable string used for UUIDv5 input.
fn serialize_operation(op: &Operation) -> String {
    match op {
        Operation::CreateFolder { path } => format!("C:{}", p(path)),
        Operation::Move {
            source,
            destination,
        } => format!("M:{}->{}", p(source), p(destination)),
        Operation::Rename { path, new_name } => format!("R:{}=>{new_name}", p(path)),
        Operation::Quarantine {
            path,
            quarantine_path,
        } => format!("Q:{}->{}", p(path), p(quarantine_path)),
        Operation::Copy {
            source,
            destination,
        } => format!("P:{}->{}", p(source), p(destination)),
        Operation::DeleteFolder { path } => format!("D:{}", p(path)),
    }
}

/// Content id for a target folder plus an ordered operation sequence.
#[must_use]
pub fn plan_id(target: &Path, ops: &[Operation]) -> Uuid {
    let mut s = format!("T:{}\n", p(target));
    for op in ops {
        s.push_str(&serialize_operation(op));
        s.push('\n');
    }
    Uuid::new_v5(&namespace(), s.as_bytes())
}

/// Deterministic id for an operation as a function of the plan id and its position.
#[must_use]
pub fn operation_id(plan_id: &Uuid, op: &Operation, idx: usize) -> Uuid {
    let mut s = serialize_operation(op);
    let _ = write!(s, "#{idx}");
    Uuid::new_v5(plan_id, s.as_bytes())
}

/// Hash over everything that influences execution: plan id, target, and every
/// operation with its id, kind tag and enabled flag, in order.
///
/// A caller that reviewed a plan passes this back on commit; any edit in between
/// produces a different value.
#[must_use]
pub fn plan_hash(plan: &OrganizePlan) -> String {
    let mut s = format!("I:{}\nT:{}\n", plan.plan_id, p(&plan.target_folder));
    for po in &plan.operations {
        let kind = match po.kind {
            Some(EntryKind::File) => "f",
            Some(EntryKind::Directory) => "d",
            None => "-",
        };
        let _ = writeln!(
            s,
            "{}|{}|{}|{}",
            po.op_id,
            u8::from(po.enabled),
            kind,
            serialize_operation(&po.operation)
        );
    }
    Uuid::new_v5(&namespace(), s.as_bytes()).to_string()
}
