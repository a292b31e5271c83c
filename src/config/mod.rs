//! Layered configuration: built-in defaults, project files, profiles.
//!
//! Loading ([`ConfigDir`]) and merging ([`resolve`]) are separate steps so
//! resolution stays pure and testable without touching the filesystem.

pub mod loader;
pub mod resolver;
pub mod schema;

pub use loader::{builtin_defaults, ConfigDir};
pub use resolver::{deep_merge, resolve, ResolvedConfig};
pub use schema::{
    DefaultsLayer, GroupSpec, ProfileLayer, ProfilesFile, ProjectInfo, ProjectLayer, StrategySpec,
    TargetSpec,
};
