//! Core of the OrgBridge directory federation system.
//!
//! Defines the cross-platform identity codec ([`identity::ExternalIdentity`]),
//! the contracts every platform adapter satisfies ([`traits::Target`],
//! [`traits::UnionUser`], [`traits::UnionDepartment`]), the authoritative
//! directory contract ([`traits::EntryCenter`]), and the supporting
//! infrastructure: the target registry, the pagination guard, and the error
//! taxonomy. Concrete adapters live in the `adapters` crate.

pub mod error;
pub mod identity;
pub mod pagination;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{FederationError, FederationResult};
pub use identity::ExternalIdentity;
pub use pagination::{DEFAULT_PAGE_LIMIT, Pager};
pub use registry::TargetRegistry;
pub use traits::{
    DepartmentEntry, EntryCenter, ExternalIdentityStore, Target, TargetEntry, UnionDepartment,
    UnionUser, UserEntry,
};
pub use types::{
    DepartmentCreateOptions, DepartmentUserOptions, DepartmentUserRole, EntryType,
    ROOT_DEPARTMENT_ID,
};
