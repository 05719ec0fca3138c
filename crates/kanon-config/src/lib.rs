//! Typed configuration for Kanon.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are rejected)
//! - Layered loading (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use kanon_config::ConfigLoader;
//!
//! # fn main() -> Result<(), kanon_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("kanon.toml")?
//!     .with_env_prefix("KANON")
//!     .load()?;
//!
//! println!("contract: {}", config.contract.path().display());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! service_name = "orders"
//!
//! [contract]
//! file_path = "/srv/contracts"
//! file_name = "orders.yaml"
//!
//! [validation]
//! validate_responses = true
//! reject_unexplained_failures = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__FIELD` variables, e.g.
//! `KANON__CONTRACT__FILE_NAME=orders.json` or
//! `KANON__VALIDATION__VALIDATE_RESPONSES=true`.

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{KanonConfig, KanonConfigBuilder};
pub use error::{ConfigError, ConfigResult};
pub use kanon_contract::ValidationConfig;
pub use loader::ConfigLoader;
pub use schema::{ContractConfig, LogFormat, LoggingConfig};
