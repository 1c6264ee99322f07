//! The canonical cross-platform identity codec.
//!
//! An [`ExternalIdentity`] ties a directory entry to one entity on one
//! configured target, encoded as:
//!
//! ```text
//! ei.<entry_type>.<entry_id>@<target_slug>.<platform>
//! ```
//!
//! The format is case-sensitive ASCII. Parsing splits on `.` expecting
//! exactly four parts, then splits the third part on `@` expecting exactly
//! two; any deviation is a full parse failure, never a partial parse.

use crate::error::{FederationError, FederationResult};
use crate::traits::{Target, UnionDepartment, UnionUser};
use crate::types::EntryType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated cross-platform entity reference.
///
/// Values are immutable and freely cloned. Every path into the type
/// (`FromStr`, serde, the `of_*` constructors) validates, so a held value is
/// always well-formed and the accessors are pure projections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalIdentity {
    entry_type: EntryType,
    entry_id: String,
    target_slug: String,
    platform: String,
}

impl ExternalIdentity {
    /// Derives the canonical identity of a user owned by a target.
    pub fn of_user(target: &dyn Target, user: &dyn UnionUser) -> FederationResult<Self> {
        Self::of(EntryType::User, &user.id(), target)
    }

    /// Derives the canonical identity of a department owned by a target.
    pub fn of_department(
        target: &dyn Target,
        dept: &dyn UnionDepartment,
    ) -> FederationResult<Self> {
        Self::of(EntryType::Dept, &dept.id(), target)
    }

    fn of(entry_type: EntryType, entry_id: &str, target: &dyn Target) -> FederationResult<Self> {
        let slug = target.slug();
        let platform = target.platform();
        // The components must not be able to corrupt the encoding, or the
        // round-trip through Display/FromStr would yield different fields.
        if entry_id.contains(['.', '@']) || slug.contains(['.', '@']) || platform.contains('.') {
            return Err(FederationError::MalformedIdentity {
                raw: format!("ei.{entry_type}.{entry_id}@{slug}.{platform}"),
            });
        }
        Ok(Self {
            entry_type,
            entry_id: entry_id.to_string(),
            target_slug: slug.to_string(),
            platform: platform.to_string(),
        })
    }

    /// Best-effort parse of a stored string list: entries that fail to parse
    /// are silently dropped, the order of survivors is preserved. Tolerates
    /// legacy or foreign strings mixed into a persisted list.
    pub fn parse_batch<I, S>(list: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        list.into_iter()
            .filter_map(|raw| raw.as_ref().parse().ok())
            .collect()
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn target_slug(&self) -> &str {
        &self.target_slug
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Checks that this identity is internal to the given target, i.e. that
    /// it can be resolved by that target directly.
    ///
    /// Internal requires equality of BOTH fields: the identity is foreign if
    /// either the platform or the slug differs. All membership-mutation call
    /// sites delegate to this single check.
    pub fn check_internal(&self, target: &dyn Target) -> FederationResult<()> {
        if self.platform != target.platform() || self.target_slug != target.slug() {
            return Err(FederationError::ForeignIdentity {
                identity: self.to_string(),
                platform: target.platform().to_string(),
                slug: target.slug().to_string(),
            });
        }
        Ok(())
    }
}

impl FromStr for ExternalIdentity {
    type Err = FederationError;

    /// Purely syntactic; performs no network or registry access.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || FederationError::MalformedIdentity {
            raw: raw.to_string(),
        };

        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 4 || parts[0] != "ei" {
            return Err(malformed());
        }
        let entry_type = EntryType::from_str(parts[1]).map_err(|_| malformed())?;
        let at_parts: Vec<&str> = parts[2].split('@').collect();
        if at_parts.len() != 2 {
            return Err(malformed());
        }
        Ok(Self {
            entry_type,
            entry_id: at_parts[0].to_string(),
            target_slug: at_parts[1].to_string(),
            platform: parts[3].to_string(),
        })
    }
}

impl fmt::Display for ExternalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ei.{}.{}@{}.{}",
            self.entry_type, self.entry_id, self.target_slug, self.platform
        )
    }
}

impl TryFrom<String> for ExternalIdentity {
    type Error = FederationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<ExternalIdentity> for String {
    fn from(id: ExternalIdentity) -> Self {
        id.to_string()
    }
}
