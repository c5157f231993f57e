//! Per-folder history of committed sessions.
//!
//! One JSON file per organized folder, named by a hash of its canonical
//! path, plus an `index.json` listing every folder. Sessions are stored
//! newest first and capped by the retention policy.
pub mod session;
pub mod store;

pub use session::session_from_job;
pub use store::HistoryStore;
