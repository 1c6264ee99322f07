//! Concrete platform adapters and the startup registry builder.
//!
//! Each adapter authenticates against one platform organization and
//! implements the `ob_core::Target` contract. [`build_registry`] is the
//! "validate all configured targets" pass: it constructs and authenticates
//! every target from configuration, so bad credentials or unreachable
//! organizations fail at startup instead of at first use.

pub mod github;

use config::{FederationConfig, TargetConfig};
use ob_core::{FederationError, FederationResult, TargetRegistry};
use std::sync::Arc;

/// Builds a registry holding a connected target for every configured entry.
///
/// Connecting resolves each target's numeric organization id and display
/// name, which doubles as a credentials check. Any failure aborts the whole
/// build; partial registries are never returned.
pub async fn build_registry(config: &FederationConfig) -> FederationResult<TargetRegistry> {
    config
        .validate()
        .map_err(|e| FederationError::configuration(e.to_string()))?;

    let mut registry = TargetRegistry::new();
    for target in &config.targets {
        match target {
            TargetConfig::Github(cfg) => {
                let target = github::GithubTarget::connect(cfg.clone()).await?;
                registry.register(Arc::new(target))?;
            }
        }
    }
    Ok(registry)
}
