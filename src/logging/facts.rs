use log::Level;
use serde_json::Value;

/// Sink for structured facts (`subsystem`, `event`, `decision`, JSON fields).
pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

/// Sink for human-readable audit lines.
pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

/// Forwards audit lines and facts to the `log` facade under the `tidyard` target.
#[derive(Default, Clone, Copy, Debug)]
pub struct LogAudit;

impl AuditSink for LogAudit {
    fn log(&self, level: Level, msg: &str) {
        log::log!(target: "tidyard", level, "{msg}");
    }
}

impl FactsEmitter for LogAudit {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let level = if decision == "failure" {
            Level::Warn
        } else {
            Level::Debug
        };
        log::log!(target: "tidyard", level, "{subsystem}.{event} {decision} {fields}");
    }
}
