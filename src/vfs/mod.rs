//! Virtual preview of a plan over real directory listings.
//!
//! Nothing here writes to disk. `simulate` and `merge` are pure; `validate`
//! and `scan` only read.
pub mod groups;
pub mod merge;
pub mod scan;
pub mod simulate;
pub mod validate;

pub use groups::{build_operation_groups, validate_plan_edits};
pub use merge::get_merged_entries;
pub use simulate::apply_plan;
pub use validate::validate_plan;
