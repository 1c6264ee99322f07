use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of the distinguished root department of every target.
///
/// The root has no platform-side group behind it; it exists so tree
/// algorithms need no special root case. It surfaces the organization's
/// display name as its own.
pub const ROOT_DEPARTMENT_ID: &str = "0";

/// What an external identity refers to.
///
/// `Project` is reserved for a future entity kind; the codec accepts it but
/// no shipped adapter resolves it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryType {
    User,
    Dept,
    Project,
}

/// Abstract role vocabulary at the federation boundary.
///
/// Adapters translate these to their native vocabulary through an explicit
/// table and fail with [`crate::FederationError::UnmappedRole`] when a role
/// has no native equivalent. They never guess or default-map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DepartmentUserRole {
    Member,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentCreateOptions {
    pub name: String,
    pub description: Option<String>,
}

/// Options for membership mutations. Carried by both add and remove so both
/// stay fail-closed on role vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentUserOptions {
    pub role: DepartmentUserRole,
}
