//! The contracts that make heterogeneous platforms interchangeable.
//!
//! `UnionUser` and `UnionDepartment` are the entity-shaped capability sets
//! satisfied both by Entry Center records and by target-adapter-backed
//! records, so lookups, tree traversal, and membership mutation are written
//! once against abstract entities instead of per-platform types.
//!
//! All multi-call platform operations are async and complete fully before
//! returning; there are no background tasks. A multi-call operation has no
//! cross-call transaction — a failure mid-sequence leaves prior successful
//! calls in effect.

use crate::error::FederationResult;
use crate::identity::ExternalIdentity;
use crate::types::{DepartmentCreateOptions, DepartmentUserOptions};
use async_trait::async_trait;

/// Abstract user entity.
pub trait UnionUser: Send + Sync {
    fn id(&self) -> String;
    fn name(&self) -> String;
    /// Zero or more addresses; platforms without public email yield none.
    fn email_set(&self) -> Vec<String>;
}

impl std::fmt::Debug for dyn UnionUser + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionUser")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("email_set", &self.email_set())
            .finish()
    }
}

/// Abstract hierarchical group entity.
///
/// Instances returned from lookups are transient per-call views holding a
/// handle to (not ownership of) their originating target or store.
#[async_trait]
pub trait UnionDepartment: Send + Sync {
    fn id(&self) -> String;
    fn name(&self) -> String;

    /// One level of the tree, never recursive. For the root this is the set
    /// of top-level groups, filtered from the full listing when the platform
    /// has no direct top-level query. Paginates internally.
    async fn child_departments(&self) -> FederationResult<Vec<Box<dyn UnionDepartment>>>;

    /// Direct members only, one level, paginated. The root yields an empty
    /// list when the platform models organization membership separately from
    /// group membership.
    async fn users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>>;

    /// Creates a child group under this department. On the root this creates
    /// a top-level group.
    async fn create_sub_department(
        &self,
        options: DepartmentCreateOptions,
    ) -> FederationResult<Box<dyn UnionDepartment>>;

    /// Adds the user behind `ext_id` to this department.
    ///
    /// Strictly in this order: verifies the identity is internal to the
    /// owning target, translates the role through the adapter's mapping
    /// table, resolves the platform-native user, then issues the mutation.
    /// The first two are local checks and happen before any network call.
    async fn add_member(
        &self,
        options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()>;

    /// Removes the user behind `ext_id` from this department. Same check
    /// order as [`Self::add_member`], including the role translation, so
    /// both mutations stay fail-closed on role vocabulary.
    async fn remove_member(
        &self,
        options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()>;
}

impl std::fmt::Debug for dyn UnionDepartment + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionDepartment")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// Reverse lookup on a target: resolve identities already established to be
/// internal to it (via [`ExternalIdentity::check_internal`] or by
/// construction). Internality of the argument is a caller precondition.
#[async_trait]
pub trait TargetEntry: Send + Sync {
    /// Point lookup of the platform-native user behind an internal identity.
    /// `NotFound` when the platform has no such entity, `InvalidIdentifier`
    /// when the entry id is not a well-formed native id for the platform.
    async fn user_by_internal_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UnionUser>>;

    async fn department_by_internal_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UnionDepartment>>;
}

/// A configured, authenticated handle to one external platform organization.
///
/// Lives in the [`crate::TargetRegistry`] for the process lifetime. The
/// attribution pair (`platform`, `slug`) is constant for the target's
/// lifetime and is what identities are checked against.
#[async_trait]
pub trait Target: TargetEntry {
    /// Platform family identifier, e.g. `github`.
    fn platform(&self) -> &str;

    /// Human-chosen short name distinguishing multiple targets of the same
    /// platform.
    fn slug(&self) -> &str;

    /// The distinguished root department (id [`crate::ROOT_DEPARTMENT_ID`],
    /// named after the organization itself).
    fn root_department(&self) -> Box<dyn UnionDepartment>;

    /// Every member of the organization. Paginates transparently and
    /// surfaces the first page-fetch error immediately — no partial-success
    /// masking.
    async fn all_users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>>;
}

impl std::fmt::Debug for dyn Target + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("platform", &self.platform())
            .field("slug", &self.slug())
            .finish()
    }
}

/// Capability of Entry Center records: the durable list of external
/// identities attached to a record, the cross-reference from the
/// authoritative entry to every platform-side counterpart.
#[async_trait]
pub trait ExternalIdentityStore: Send + Sync {
    fn external_identities(&self) -> Vec<ExternalIdentity>;

    /// Replaces the attached identity list. Values are valid by construction
    /// (every path into [`ExternalIdentity`] validates); implementations may
    /// still fail on persistence errors.
    async fn set_external_identities(
        &mut self,
        ext_ids: Vec<ExternalIdentity>,
    ) -> FederationResult<()>;
}

pub trait UserEntry: UnionUser + ExternalIdentityStore {}
impl<T: UnionUser + ExternalIdentityStore + ?Sized> UserEntry for T {}

pub trait DepartmentEntry: UnionDepartment + ExternalIdentityStore {}
impl<T: UnionDepartment + ExternalIdentityStore + ?Sized> DepartmentEntry for T {}

impl std::fmt::Debug for dyn UserEntry + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserEntry")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("email_set", &self.email_set())
            .finish()
    }
}

impl std::fmt::Debug for dyn DepartmentEntry + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepartmentEntry")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// The authoritative directory: forward lookup from ANY external identity
/// (regardless of origin platform) to the record whose stored identity list
/// contains it.
#[async_trait]
pub trait EntryCenter: Send + Sync {
    async fn user_by_external_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UserEntry>>;

    async fn department_by_external_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn DepartmentEntry>>;
}
