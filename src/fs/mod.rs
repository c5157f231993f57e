pub mod atomic;
pub mod backup;
pub mod checksum;
pub mod ops;
pub mod paths;
pub mod quarantine;
pub mod restore;

pub use atomic::{fsync_parent_dir, open_dir_nofollow, read_json, write_json_durable};
pub use backup::{backup_path_with_tag, move_aside};
pub use checksum::{checksum, checksum_many, compare};
pub use paths::{is_protected, is_safe_path, validate_folder};
