//! Policy configuration and store locations.
//!
//! Consumers typically construct a [`Policy`](crate::policy::Policy) via
//! `Policy::default()` or a preset and then customize fields before creating
//! a [`Tidyard`](crate::Tidyard) instance.
//!
//! Submodules:
//! - `config`: policy struct and presets
//! - `types`: grouped policy sections
//! - `store`: on-disk store layout

pub mod config;
pub mod store;
pub mod types;

pub use config::Policy;
pub use store::StorePaths;
