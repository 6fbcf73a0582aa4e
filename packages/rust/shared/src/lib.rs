//! Shared types, error model, and configuration for Canonic.
//!
//! This crate is the foundation depended on by all other Canonic crates.
//! It provides:
//! - [`CanonicError`], the unified error type
//! - Domain types ([`EntityType`], [`Candidate`], [`CanonicalTag`], [`ObjectTable`])
//! - Configuration ([`AppConfig`], [`ResolverSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BridgeConfig, DirectoryConfig, OrganizationConfig, PathsConfig, ResolverConfig,
    ResolverSettings, config_dir, config_file_path, init_config, init_config_in, load_config,
    load_config_from, validate_api_key, validate_config,
};
pub use error::{CanonicError, Result};
pub use types::{
    Candidate, CanonicalTag, DetectedSystem, EXACT_SCORE, EntityType, ObjectEntry, ObjectTable,
    Requester, TaskMetadata,
};
