//! # Federation Configuration
//!
//! Configuration structures for OrgBridge targets, plus TOML/YAML file
//! loading with format auto-detection. Validation uses `validator` derive
//! rules; [`FederationConfig::validate`] additionally rejects duplicate
//! `(platform, slug)` pairs, so a bad target set is a startup error rather
//! than a runtime one.

mod config;
mod file_loader;

pub use config::{FederationConfig, GithubTargetConfig, TargetConfig};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
