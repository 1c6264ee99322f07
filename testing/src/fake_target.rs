use async_trait::async_trait;
use dashmap::DashMap;
use ob_core::{
    DepartmentCreateOptions, DepartmentUserOptions, DepartmentUserRole, EntryType,
    ExternalIdentity, FederationError, FederationResult, Pager, ROOT_DEPARTMENT_ID, Target,
    TargetEntry, UnionDepartment, UnionUser,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A user served by [`FakeTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeUser {
    pub id: String,
    pub name: String,
    pub emails: Vec<String>,
}

impl FakeUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            emails: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }
}

impl UnionUser for FakeUser {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn email_set(&self) -> Vec<String> {
        self.emails.clone()
    }
}

#[derive(Debug, Clone)]
struct DeptRecord {
    name: String,
    parent: Option<String>,
}

struct FakeTargetInner {
    platform: String,
    slug: String,
    org_name: String,
    user_pages: Vec<Vec<FakeUser>>,
    failing_users_page: Option<u32>,
    endless_user_pages: bool,
    page_limit: u32,
    directory: DashMap<String, FakeUser>,
    departments: DashMap<String, DeptRecord>,
    members: DashMap<String, Vec<(String, DepartmentUserRole)>>,
    next_dept_id: AtomicU64,
}

/// In-memory platform adapter for contract tests.
///
/// Serves `all_users` from explicitly scripted pages through the same
/// cursor-plus-[`Pager`] loop real adapters use. The role table is
/// deliberately partial (`Member` maps, `Admin` does not) so `UnmappedRole`
/// is exercisable.
#[derive(Clone)]
pub struct FakeTarget {
    inner: Arc<FakeTargetInner>,
}

pub struct FakeTargetBuilder {
    platform: String,
    slug: String,
    org_name: String,
    user_pages: Vec<Vec<FakeUser>>,
    failing_users_page: Option<u32>,
    endless_user_pages: bool,
    page_limit: u32,
    extra_users: Vec<FakeUser>,
    departments: Vec<(String, DeptRecord)>,
}

impl FakeTargetBuilder {
    /// Scripts the pages `all_users` serves, in page order. Uneven sizes and
    /// empty pages are allowed.
    pub fn user_pages(mut self, pages: Vec<Vec<FakeUser>>) -> Self {
        self.user_pages = pages;
        self
    }

    /// Makes the given 1-based page fetch fail.
    pub fn failing_users_page(mut self, page: u32) -> Self {
        self.failing_users_page = Some(page);
        self
    }

    /// Serves a next page forever, for page-cap tests.
    pub fn endless_user_pages(mut self) -> Self {
        self.endless_user_pages = true;
        self
    }

    pub fn page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Adds a user to the point-lookup directory without putting it on a
    /// listing page.
    pub fn user(mut self, user: FakeUser) -> Self {
        self.extra_users.push(user);
        self
    }

    /// Adds a department; `parent` of `None` makes it top-level.
    pub fn department(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: Option<&str>,
    ) -> Self {
        self.departments.push((
            id.into(),
            DeptRecord {
                name: name.into(),
                parent: parent.map(str::to_string),
            },
        ));
        self
    }

    pub fn build(self) -> FakeTarget {
        let directory = DashMap::new();
        for user in self.user_pages.iter().flatten().chain(&self.extra_users) {
            directory.insert(user.id.clone(), user.clone());
        }
        let departments = DashMap::new();
        for (id, record) in self.departments {
            departments.insert(id, record);
        }
        FakeTarget {
            inner: Arc::new(FakeTargetInner {
                platform: self.platform,
                slug: self.slug,
                org_name: self.org_name,
                user_pages: self.user_pages,
                failing_users_page: self.failing_users_page,
                endless_user_pages: self.endless_user_pages,
                page_limit: self.page_limit,
                directory,
                departments,
                members: DashMap::new(),
                next_dept_id: AtomicU64::new(1),
            }),
        }
    }
}

impl FakeTarget {
    pub fn builder(
        platform: impl Into<String>,
        slug: impl Into<String>,
        org_name: impl Into<String>,
    ) -> FakeTargetBuilder {
        FakeTargetBuilder {
            platform: platform.into(),
            slug: slug.into(),
            org_name: org_name.into(),
            user_pages: Vec::new(),
            failing_users_page: None,
            endless_user_pages: false,
            page_limit: ob_core::DEFAULT_PAGE_LIMIT,
            extra_users: Vec::new(),
            departments: Vec::new(),
        }
    }

    /// Members of a department as `(user id, role)` pairs, for asserting
    /// mutation effects.
    pub fn members_of(&self, dept_id: &str) -> Vec<(String, DepartmentUserRole)> {
        self.inner
            .members
            .get(dept_id)
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn native_role(&self, role: DepartmentUserRole) -> FederationResult<&'static str> {
        // Deliberately partial so UnmappedRole has a code path to test.
        match role {
            DepartmentUserRole::Member => Ok("member"),
            DepartmentUserRole::Admin => Err(FederationError::UnmappedRole {
                role,
                platform: self.inner.platform.clone(),
            }),
        }
    }

    fn fetch_users_page(&self, index: usize) -> FederationResult<(Vec<FakeUser>, Option<usize>)> {
        if self.inner.endless_user_pages {
            return Ok((Vec::new(), Some(index + 1)));
        }
        if self.inner.failing_users_page == Some(index as u32 + 1) {
            return Err(FederationError::adapter_message(
                "fake.list_org_members",
                format!("scripted failure on page {}", index + 1),
            ));
        }
        let items = self.inner.user_pages.get(index).cloned().unwrap_or_default();
        let next = if index + 1 < self.inner.user_pages.len() {
            Some(index + 1)
        } else {
            None
        };
        Ok((items, next))
    }

    fn department_view(&self, key: Option<String>) -> FakeDepartment {
        FakeDepartment {
            target: self.clone(),
            key,
        }
    }
}

#[async_trait]
impl TargetEntry for FakeTarget {
    async fn user_by_internal_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UnionUser>> {
        self.inner
            .directory
            .get(ext_id.entry_id())
            .map(|user| Box::new(user.clone()) as Box<dyn UnionUser>)
            .ok_or_else(|| FederationError::NotFound {
                entry_type: EntryType::User,
                identity: ext_id.to_string(),
            })
    }

    async fn department_by_internal_identity(
        &self,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<Box<dyn UnionDepartment>> {
        let key = ext_id.entry_id().to_string();
        if !self.inner.departments.contains_key(&key) {
            return Err(FederationError::NotFound {
                entry_type: EntryType::Dept,
                identity: ext_id.to_string(),
            });
        }
        Ok(Box::new(self.department_view(Some(key))))
    }
}

#[async_trait]
impl Target for FakeTarget {
    fn platform(&self) -> &str {
        &self.inner.platform
    }

    fn slug(&self) -> &str {
        &self.inner.slug
    }

    fn root_department(&self) -> Box<dyn UnionDepartment> {
        Box::new(self.department_view(None))
    }

    async fn all_users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>> {
        let mut pager = Pager::with_limit("fake.list_org_members", self.inner.page_limit);
        let mut users: Vec<Box<dyn UnionUser>> = Vec::new();
        let mut cursor = Some(0);
        while let Some(index) = cursor {
            pager.advance()?;
            let (page, next) = self.fetch_users_page(index)?;
            users.extend(
                page.into_iter()
                    .map(|user| Box::new(user) as Box<dyn UnionUser>),
            );
            cursor = next;
        }
        Ok(users)
    }
}

struct FakeDepartment {
    target: FakeTarget,
    /// `None` is the root department.
    key: Option<String>,
}

impl FakeDepartment {
    fn require_team(&self, operation: &str) -> FederationResult<&str> {
        self.key.as_deref().ok_or_else(|| {
            FederationError::adapter_message(
                operation,
                "the root department has no backing team",
            )
        })
    }
}

#[async_trait]
impl UnionDepartment for FakeDepartment {
    fn id(&self) -> String {
        self.key
            .clone()
            .unwrap_or_else(|| ROOT_DEPARTMENT_ID.to_string())
    }

    fn name(&self) -> String {
        match &self.key {
            None => self.target.inner.org_name.clone(),
            Some(key) => self
                .target
                .inner
                .departments
                .get(key)
                .map(|d| d.name.clone())
                .unwrap_or_default(),
        }
    }

    async fn child_departments(&self) -> FederationResult<Vec<Box<dyn UnionDepartment>>> {
        let mut keys: Vec<String> = self
            .target
            .inner
            .departments
            .iter()
            .filter(|entry| entry.value().parent.as_deref() == self.key.as_deref())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys
            .into_iter()
            .map(|key| {
                Box::new(self.target.department_view(Some(key))) as Box<dyn UnionDepartment>
            })
            .collect())
    }

    async fn users(&self) -> FederationResult<Vec<Box<dyn UnionUser>>> {
        // Org membership is modeled separately from team membership.
        let Some(key) = self.key.as_deref() else {
            return Ok(Vec::new());
        };
        let members = self.target.members_of(key);
        Ok(members
            .into_iter()
            .filter_map(|(user_id, _)| {
                self.target
                    .inner
                    .directory
                    .get(&user_id)
                    .map(|user| Box::new(user.clone()) as Box<dyn UnionUser>)
            })
            .collect())
    }

    async fn create_sub_department(
        &self,
        options: DepartmentCreateOptions,
    ) -> FederationResult<Box<dyn UnionDepartment>> {
        let id = format!(
            "t{}",
            self.target.inner.next_dept_id.fetch_add(1, Ordering::SeqCst)
        );
        self.target.inner.departments.insert(
            id.clone(),
            DeptRecord {
                name: options.name,
                parent: self.key.clone(),
            },
        );
        Ok(Box::new(self.target.department_view(Some(id))))
    }

    async fn add_member(
        &self,
        options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()> {
        ext_id.check_internal(&self.target)?;
        self.target.native_role(options.role)?;
        let key = self.require_team("fake.add_team_membership")?;
        let user = self.target.user_by_internal_identity(ext_id).await?;
        let mut members = self.target.inner.members.entry(key.to_string()).or_default();
        members.retain(|(id, _)| *id != user.id());
        members.push((user.id(), options.role));
        Ok(())
    }

    async fn remove_member(
        &self,
        options: DepartmentUserOptions,
        ext_id: &ExternalIdentity,
    ) -> FederationResult<()> {
        ext_id.check_internal(&self.target)?;
        self.target.native_role(options.role)?;
        let key = self.require_team("fake.remove_team_membership")?;
        let user = self.target.user_by_internal_identity(ext_id).await?;
        if let Some(mut members) = self.target.inner.members.get_mut(key) {
            members.retain(|(id, _)| *id != user.id());
        }
        Ok(())
    }
}
