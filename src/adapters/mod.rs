pub mod events;
pub mod lock;
pub mod mutator;

pub use events::{CancelToken, EngineEvent, EventSink, NoopEvents};
pub use lock::file::FileLockManager;
pub use lock::{LockGuard, LockManager};
pub use mutator::{Mutator, StdMutator};
