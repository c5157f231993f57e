pub mod checksum;
pub mod errors;
pub mod history;
pub mod ids;
pub mod plan;
pub mod report;
pub mod scope;
pub mod undo;
pub mod vfs;
pub mod wal;

pub use checksum::*;
pub use errors::*;
pub use history::*;
pub use ids::*;
pub use plan::*;
pub use report::*;
pub use undo::*;
pub use vfs::*;
pub use wal::*;
