use async_trait::async_trait;
use dashmap::DashMap;
use ob_core::{
    DepartmentCreateOptions, DepartmentUserOptions, DepartmentUserRole, EntryCenter, EntryType,
    ExternalIdentity, ExternalIdentityStore, FederationError, FederationResult, UnionDepartment,
    UnionUser, UserEntry,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct UserRecord {
    name: String,
    emails: Vec<String>,
    identities: Vec<ExternalIdentity>,
}

#[derive(Debug, Clone)]
struct DeptRecord {
    name: String,
    parent: Option<String>,
    identities: Vec<ExternalIdentity>,
    members: Vec<(String, DepartmentUserRole)>,
}

struct CenterInner {
    users: DashMap<String, UserRecord>,
    departments: DashMap<String, DeptRecord>,
    next_dept_id: AtomicU64,
}

/// Authoritative-directory fake.
///
/// Records hold attached identity lists; forward lookup scans for
/// containment. Returned entries are write-through views of this store, so
/// `set_external_identities` on a view is observable on the next lookup.
#[derive(Clone)]
pub struct InMemoryEntryCenter {
    inner: Arc<CenterInner>,
}

impl Default for InMemoryEntryCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEntryCenter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CenterInner {
                users: DashMap::new(),
                departments: DashMap::new(),
                next_dept_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn add_user(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        emails: Vec<String>,
        identities: Vec<ExternalIdentity>,
    ) {
        self.inner.users.insert(
            id.into(),
            UserRecord {
                name: name.into(),
                emails,
                identities,
            },
        );
    }

    pub fn add_department(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: Option<&str>,
        identities: Vec<ExternalIdentity>,
    ) {
        self.inner.departments.insert(
            id.into(),
            DeptRecord {
                name: name.into(),
                parent: parent.map(str::to_string),
                identities,
                members: Vec::new(),
            },
        );
    }

    fn user_view(&self, id: String) -> CenterUserEntry {
        CenterUserEntry {
            center: self.clone(),
            id,
        }
    }

    fn department_view(&self, id: String) -> CenterDepartmentEntry {
        CenterDepartmentEntry {
            center: self.clone(),
            id,
        }
    }

    fn user_id_with_identity(&self, ext_id: &ExternalIdentity) -> Option<String> {
        self.inner
            .users
            .iter()
            .find(|entry| entry.value().identities.contains(ext_id))
            .map(|entry| entry.key().clone())
    }
}

#[async_trait]
impl EntryCenter for InMemoryEntryCenter {
    async fn user_by_external_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UserEntry>> {
        self.user_id_with_identity(ext_id)
            .map(|id| Box::new(self.user_view(id)) as Box<dyn UserEntry>)
            .ok_or_else(|| FederationError::NotFound {
                entry_type: EntryType::User,
                identity: ext_id.to_string(),
            })
    }

    async fn department_by_external_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn ob_core::DepartmentEntry>> {
        self.inner
            .departments
            .iter()
            .find(|entry| entry.value().identities.contains(ext_id))
            .map(|entry| {
                Box::new(self.department_view(entry.key().clone()))
                    as Box<dyn ob_core::DepartmentEntry>
            })
            .ok_or_else(|| FederationError::NotFound {
                entry_type: EntryType::Dept,
                identity: ext_id.to_string(),
            })
    }
}

/// Write-through view of one user record.
pub struct CenterUserEntry {
    center: InMemoryEntryCenter,
    id: String,
}

impl UnionUser for CenterUserEntry {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.center
            .inner
            .users
            .get(&self.id)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }

    fn email_set(&self) -> Vec<String> {
        self.center
            .inner
            .users
            .get(&self.id)
            .map(|u| u.emails.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExternalIdentityStore for CenterUserEntry {
    fn external_identities(&self) -> Vec<ExternalIdentity> {
        self.center
            .inner
            .users
            .get(&self.id)
            .map(|u| u.identities.clone())
            .unwrap_or_default()
    }

    async fn set_external_identities(
        &mut self,
        ext_ids: Vec<ExternalIdentity>,
    ) -> FederationResult<()> {
        let mut record =
            self.center
                .inner
                .users
                .get_mut(&self.id)
                .ok_or_else(|| FederationError::NotFound {
                    entry_type: EntryType::User,
                    identity: self.id.clone(),
                })?;
        record.identities = ext_ids;
        Ok(())
    }
}

/// Write-through view of one department record.
pub struct CenterDepartmentEntry {
    center: InMemoryEntryCenter,
    id: String,
}

#[async_trait]
impl UnionDepartment for CenterDepartmentEntry {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.center
            .inner
            .departments
            .get(&self.id)
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    async fn child_departments(&self) -> FederationResult<Vec<Box<dyn UnionDepartment>>> {
        let mut ids: Vec<String> = self
            .center
            .inner
            .departments
            .iter()
            .filter(|entry| entry.value().parent.as_deref() == Some(self.id.as_str()))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .map(|id| Box::new(self.center.department_view(id)) as Box<dyn UnionDepartment>)
            .collect())
    }

    async fn users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>> {
        let members = self
            .center
            .inner
            .departments
            .get(&self.id)
            .map(|d| d.members.clone())
            .unwrap_or_default();
        Ok(members
            .into_iter()
            .map(|(user_id, _)| Box::new(self.center.user_view(user_id)) as Box<dyn UnionUser>)
            .collect())
    }

    async fn create_sub_department(
        &self,
        options: DepartmentCreateOptions,
    ) -> FederationResult<Box<dyn UnionDepartment>> {
        let id = format!(
            "d{}",
            self.center.inner.next_dept_id.fetch_add(1, Ordering::SeqCst)
        );
        self.center.inner.departments.insert(
            id.clone(),
            DeptRecord {
                name: options.name,
                parent: Some(self.id.clone()),
                identities: Vec::new(),
                members: Vec::new(),
            },
        );
        Ok(Box::new(self.center.department_view(id)))
    }

    async fn add_member(
        &self,
        options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()> {
        // The center stores the abstract role directly; its role mapping is
        // total by construction.
        let user_id =
            self.center
                .user_id_with_identity(ext_id)
                .ok_or_else(|| FederationError::NotFound {
                    entry_type: EntryType::User,
                    identity: ext_id.to_string(),
                })?;
        let mut record = self
            .center
            .inner
            .departments
            .get_mut(&self.id)
            .ok_or_else(|| FederationError::NotFound {
                entry_type: EntryType::Dept,
                identity: self.id.clone(),
            })?;
        record.members.retain(|(id, _)| *id != user_id);
        record.members.push((user_id, options.role));
        Ok(())
    }

    async fn remove_member(
        &self,
        _options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()> {
        let user_id =
            self.center
                .user_id_with_identity(ext_id)
                .ok_or_else(|| FederationError::NotFound {
                    entry_type: EntryType::User,
                    identity: ext_id.to_string(),
                })?;
        let mut record = self
            .center
            .inner
            .departments
            .get_mut(&self.id)
            .ok_or_else(|| FederationError::NotFound {
                entry_type: EntryType::Dept,
                identity: self.id.clone(),
            })?;
        record.members.retain(|(id, _)| *id != user_id);
        Ok(())
    }
}

#[async_trait]
impl ExternalIdentityStore for CenterDepartmentEntry {
    fn external_identities(&self) -> Vec<ExternalIdentity> {
        self.center
            .inner
            .departments
            .get(&self.id)
            .map(|d| d.identities.clone())
            .unwrap_or_default()
    }

    async fn set_external_identities(
        &mut self,
        ext_ids: Vec<ExternalIdentity>,
    ) -> FederationResult<()> {
        let mut record = self
            .center
            .inner
            .departments
            .get_mut(&self.id)
            .ok_or_else(|| FederationError::NotFound {
                entry_type: EntryType::Dept,
                identity: self.id.clone(),
            })?;
        record.identities = ext_ids;
        Ok(())
    }
}
