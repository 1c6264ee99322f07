//! Resolution of `(platform, slug)` pairs to live targets.
//!
//! The registry is an explicit object constructed once at startup and handed
//! to whatever needs target resolution, so tests can substitute fakes
//! without touching process state. It is read-only after population and safe
//! for concurrent reads.

use crate::error::{FederationError, FederationResult};
use crate::identity::ExternalIdentity;
use crate::traits::Target;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct TargetRegistry {
    targets: HashMap<(String, String), Arc<dyn Target>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a target under its own attribution. A duplicate
    /// `(platform, slug)` pair is a configuration error, not a replacement.
    pub fn register(&mut self, target: Arc<dyn Target>) -> FederationResult<()> {
        let key = (target.platform().to_string(), target.slug().to_string());
        if self.targets.contains_key(&key) {
            return Err(FederationError::configuration(format!(
                "duplicate target {}/{}",
                key.0, key.1
            )));
        }
        self.targets.insert(key, target);
        Ok(())
    }

    pub fn get(&self, platform: &str, slug: &str) -> FederationResult<Arc<dyn Target>> {
        self.targets
            .get(&(platform.to_string(), slug.to_string()))
            .cloned()
            .ok_or_else(|| FederationError::TargetNotFound {
                platform: platform.to_string(),
                slug: slug.to_string(),
            })
    }

    /// Resolves an identity to its originating target.
    pub fn resolve(&self, ext_id: &ExternalIdentity) -> FederationResult<Arc<dyn Target>> {
        self.get(ext_id.platform(), ext_id.target_slug())
    }

    pub fn targets(&self) -> impl Iterator<Item = &Arc<dyn Target>> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{TargetEntry, UnionDepartment, UnionUser};
    use async_trait::async_trait;

    struct StubTarget {
        platform: &'static str,
        slug: &'static str,
    }

    #[async_trait]
    impl TargetEntry for StubTarget {
        async fn user_by_internal_identity(
            &self,
            ext_id: &ExternalIdentity,
        ) -> FederationResult<Box<dyn UnionUser>> {
            Err(FederationError::NotFound {
                entry_type: ext_id.entry_type(),
                identity: ext_id.to_string(),
            })
        }

        async fn department_by_internal_identity(
            &self,
            ext_id: &ExternalIdentity,
        ) -> FederationResult<Box<dyn UnionDepartment>> {
            Err(FederationError::NotFound {
                entry_type: ext_id.entry_type(),
                identity: ext_id.to_string(),
            })
        }
    }

    #[async_trait]
    impl Target for StubTarget {
        fn platform(&self) -> &str {
            self.platform
        }

        fn slug(&self) -> &str {
            self.slug
        }

        fn root_department(&self) -> Box<dyn UnionDepartment> {
            unimplemented!("not needed by registry tests")
        }

        async fn all_users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>> {
            Ok(Vec::new())
        }
    }

    fn stub(platform: &'static str, slug: &'static str) -> Arc<dyn Target> {
        Arc::new(StubTarget { platform, slug })
    }

    #[test]
    fn registers_and_gets() {
        let mut registry = TargetRegistry::new();
        registry.register(stub("github", "acme")).unwrap();
        registry.register(stub("github", "other")).unwrap();
        registry.register(stub("gitlab", "acme")).unwrap();
        assert_eq!(registry.len(), 3);

        let target = registry.get("github", "acme").unwrap();
        assert_eq!(target.platform(), "github");
        assert_eq!(target.slug(), "acme");
    }

    #[test]
    fn duplicate_registration_is_a_configuration_error() {
        let mut registry = TargetRegistry::new();
        registry.register(stub("github", "acme")).unwrap();
        let err = registry.register(stub("github", "acme")).unwrap_err();
        assert!(matches!(err, FederationError::Configuration { .. }));
    }

    #[test]
    fn missing_pair_is_target_not_found() {
        let registry = TargetRegistry::new();
        let err = registry.get("github", "acme").unwrap_err();
        match err {
            FederationError::TargetNotFound { platform, slug } => {
                assert_eq!(platform, "github");
                assert_eq!(slug, "acme");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolves_identities_by_origin() {
        let mut registry = TargetRegistry::new();
        registry.register(stub("github", "acme")).unwrap();

        let internal: ExternalIdentity = "ei.user.42@acme.github".parse().unwrap();
        assert!(registry.resolve(&internal).is_ok());

        let foreign: ExternalIdentity = "ei.user.42@acme.gitlab".parse().unwrap();
        assert!(matches!(
            registry.resolve(&foreign).unwrap_err(),
            FederationError::TargetNotFound { .. }
        ));
    }
}
