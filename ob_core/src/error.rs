use crate::types::{DepartmentUserRole, EntryType};
use thiserror::Error;

pub type FederationResult<T> = Result<T, FederationError>;

/// Error taxonomy of the federation core.
///
/// Syntactic and mapping failures (`MalformedIdentity`, `ForeignIdentity`,
/// `UnmappedRole`) are detected locally and returned before any network call.
/// Platform failures are never retried here; retry policy belongs to the
/// transport. Every variant carries the offending identity, platform, or
/// operation so callers can log it — the core does no logging of its own.
#[derive(Debug, Error)]
pub enum FederationError {
    #[error("not an external identity: {raw}")]
    MalformedIdentity { raw: String },

    #[error("no target configured for platform {platform} with slug {slug}")]
    TargetNotFound { platform: String, slug: String },

    #[error("identity {identity} is not internal to target {platform}/{slug}")]
    ForeignIdentity {
        identity: String,
        platform: String,
        slug: String,
    },

    #[error("{entry_type} not found: {identity}")]
    NotFound {
        entry_type: EntryType,
        identity: String,
    },

    #[error("invalid {platform} identifier {entry_id}: {reason}")]
    InvalidIdentifier {
        entry_id: String,
        platform: String,
        reason: String,
    },

    #[error("no {role} role mapping on platform {platform}")]
    UnmappedRole {
        role: DepartmentUserRole,
        platform: String,
    },

    #[error("{operation} failed: {source}")]
    Adapter {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{operation} exceeded the page limit of {limit}")]
    PaginationLimitExceeded { operation: String, limit: u32 },

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl FederationError {
    /// Wraps an opaque platform or transport failure, tagged with the logical
    /// operation that issued it.
    pub fn adapter(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Adapter {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Adapter failure with a plain message and no underlying error value.
    pub fn adapter_message(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            operation: operation.into(),
            source: message.into().into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_error_keeps_operation_and_source() {
        let err = FederationError::adapter_message("github.list_org_members", "boom");
        assert_eq!(
            err.to_string(),
            "github.list_org_members failed: boom"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn foreign_identity_names_both_sides() {
        let err = FederationError::ForeignIdentity {
            identity: "ei.user.42@other.github".to_string(),
            platform: "github".to_string(),
            slug: "acme".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ei.user.42@other.github"));
        assert!(msg.contains("github/acme"));
    }
}
