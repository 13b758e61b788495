//! Shared types, error model, and configuration for noterelay.
//!
//! This crate is the foundation depended on by all other noterelay crates.
//! It provides:
//! - [`RelayError`]: the unified error type
//! - Domain types ([`Person`], [`Company`], [`UserItem`], [`Credentials`], [`RelayResponse`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EnrichmentConfig, HttpConfig, ServerConfig, WritebackConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{RelayError, Result};
pub use types::{
    Company, Credentials, Employment, MetricValue, Metrics, Outcome, Person, RelayResponse,
    UserItem,
};
