use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const TS_ZERO: &str = "1970-01-01T00:00:00Z";

/// Fields that differ between two runs of the same plan on the same tree.
const VOLATILE: &[&str] = &["duration_ms", "plan_hash", "errors"];

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| TS_ZERO.to_string())
}

fn mask(obj: &mut Map<String, Value>, key: &str) {
    if let Some(v) = obj.get_mut(key) {
        if v.as_str().is_some_and(|s| !s.is_empty()) {
            *v = Value::String("***".into());
        }
    }
}

/// Make a fact comparable across runs: pin `ts`, drop volatile fields and
/// mask the generated job and session ids.
pub fn redact_event(mut v: Value) -> Value {
    if let Some(obj) = v.as_object_mut() {
        obj.insert("ts".into(), Value::String(TS_ZERO.to_string()));
        for k in VOLATILE {
            obj.remove(*k);
        }
        mask(obj, "job_id");
        mask(obj, "session_id");
        mask(obj, "undo_of");
    }
    v
}
