use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use teamflow_auth::RoleName;
use teamflow_core::{
    AccountId, Entity, MemberId, ProjectId, RoleId, TaskId, UserId, WorkspaceId,
};
use teamflow_projects::{Project, ProjectAnalytics, Task};
use teamflow_workspaces::{Account, Member, MemberDetails, Provider, RoleRecord, User, Workspace};

use super::{FailPoint, Store, StoreError, StoreResult, StoreTx};

fn put<T: Entity + Clone>(table: &mut HashMap<T::Id, T>, row: &T) {
    table.insert(row.id(), row.clone());
}

fn replace<T: Entity + Clone>(table: &mut HashMap<T::Id, T>, row: &T) {
    if let Some(slot) = table.get_mut(&row.id()) {
        *slot = row.clone();
    }
}

fn clamp(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    accounts: HashMap<AccountId, Account>,
    workspaces: HashMap<WorkspaceId, Workspace>,
    roles: HashMap<RoleId, RoleRecord>,
    members: HashMap<MemberId, Member>,
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
}

impl Tables {
    fn user_by_email(&self, email: &str) -> Option<User> {
        self.users.values().find(|u| u.email == email).cloned()
    }

    fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate {
                entity: "user",
                detail: format!("email {}", user.email),
            });
        }
        put(&mut self.users, user);
        Ok(())
    }

    fn update_user(&mut self, user: &User) -> StoreResult<()> {
        if self
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Duplicate {
                entity: "user",
                detail: format!("email {}", user.email),
            });
        }
        replace(&mut self.users, user);
        Ok(())
    }

    fn insert_account(&mut self, account: &Account) -> StoreResult<()> {
        if self
            .accounts
            .values()
            .any(|a| a.provider == account.provider && a.provider_id == account.provider_id)
        {
            return Err(StoreError::Duplicate {
                entity: "account",
                detail: format!("{} {}", account.provider, account.provider_id),
            });
        }
        put(&mut self.accounts, account);
        Ok(())
    }

    fn insert_workspace(&mut self, workspace: &Workspace) -> StoreResult<()> {
        if self
            .workspaces
            .values()
            .any(|w| w.invite_code == workspace.invite_code)
        {
            return Err(StoreError::Duplicate {
                entity: "workspace",
                detail: format!("invite code {}", workspace.invite_code),
            });
        }
        put(&mut self.workspaces, workspace);
        Ok(())
    }

    fn role_by_name(&self, name: RoleName) -> Option<RoleRecord> {
        self.roles
            .values()
            .find(|r| r.name == name.as_str())
            .cloned()
    }

    fn member(&self, user_id: UserId, workspace_id: WorkspaceId) -> Option<Member> {
        self.members
            .values()
            .find(|m| m.user_id == user_id && m.workspace_id == workspace_id)
            .cloned()
    }

    fn insert_member(&mut self, member: &Member) -> StoreResult<()> {
        if self.member(member.user_id, member.workspace_id).is_some() {
            return Err(StoreError::Duplicate {
                entity: "member",
                detail: format!("user {} in workspace {}", member.user_id, member.workspace_id),
            });
        }
        put(&mut self.members, member);
        Ok(())
    }

    fn project(&self, id: ProjectId, workspace_id: WorkspaceId) -> Option<Project> {
        self.projects
            .get(&id)
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
    }

    fn project_tasks(
        &self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> impl Iterator<Item = &Task> {
        self.tasks
            .values()
            .filter(move |t| t.project_id == project_id && t.workspace_id == workspace_id)
    }

    fn insert_task(&mut self, task: &Task) -> StoreResult<()> {
        if self.tasks.values().any(|t| t.task_code == task.task_code) {
            return Err(StoreError::Duplicate {
                entity: "task",
                detail: format!("task code {}", task.task_code),
            });
        }
        put(&mut self.tasks, task);
        Ok(())
    }

    fn delete_tasks(&mut self, project_id: ProjectId, workspace_id: WorkspaceId) -> u64 {
        let before = self.tasks.len();
        self.tasks
            .retain(|_, t| !(t.project_id == project_id && t.workspace_id == workspace_id));
        (before - self.tasks.len()) as u64
    }

    fn delete_project(&mut self, id: ProjectId, workspace_id: WorkspaceId) -> u64 {
        match self.project(id, workspace_id) {
            Some(_) => {
                self.projects.remove(&id);
                1
            }
            None => 0,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: RwLock<Tables>,
    /// Serializes writers: a transaction holds it from `begin` until it ends.
    writer: Arc<AsyncMutex<()>>,
    fail_points: Mutex<HashSet<FailPoint>>,
}

/// In-memory store.
///
/// Intended for tests/dev. Transactions work on a private copy of the tables
/// that replaces the shared copy on commit, so an aborted transaction leaves
/// no trace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Empty store with no role reference data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one role record per [`RoleName`].
    pub fn with_default_roles() -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.inner.tables.write() {
            for name in RoleName::ALL {
                put(&mut tables.roles, &RoleRecord::new(name));
            }
        }
        store
    }

    /// Make every subsequent operation at `point` fail with
    /// [`StoreError::Injected`] until [`Self::clear_failures`] is called.
    pub fn fail_at(&self, point: FailPoint) {
        if let Ok(mut points) = self.inner.fail_points.lock() {
            points.insert(point);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut points) = self.inner.fail_points.lock() {
            points.clear();
        }
    }

    fn check(&self, point: FailPoint) -> StoreResult<()> {
        let armed = self
            .inner
            .fail_points
            .lock()
            .map_err(|_| StoreError::backend("fail_points", "lock poisoned"))?
            .contains(&point);
        if armed {
            tracing::debug!(?point, "injected store failure");
            return Err(StoreError::Injected(point));
        }
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> StoreResult<R> {
        let tables = self
            .inner
            .tables
            .read()
            .map_err(|_| StoreError::backend("read", "lock poisoned"))?;
        Ok(f(&tables))
    }

    async fn write<R>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<R>) -> StoreResult<R> {
        let _writer = self.inner.writer.lock().await;
        let mut tables = self
            .inner
            .tables
            .write()
            .map_err(|_| StoreError::backend("write", "lock poisoned"))?;
        f(&mut tables)
    }

    #[cfg(test)]
    pub(crate) fn counts(&self) -> RowCounts {
        self.read(|t| RowCounts {
            users: t.users.len(),
            accounts: t.accounts.len(),
            workspaces: t.workspaces.len(),
            members: t.members.len(),
            projects: t.projects.len(),
            tasks: t.tasks.len(),
        })
        .unwrap_or_default()
    }
}

#[cfg(test)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowCounts {
    pub users: usize,
    pub accounts: usize,
    pub workspaces: usize,
    pub members: usize,
    pub projects: usize,
    pub tasks: usize,
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let writer = self.inner.writer.clone().lock_owned().await;
        let working = self.read(Tables::clone)?;
        Ok(Box::new(InMemoryTx {
            store: self.clone(),
            working,
            _writer: writer,
        }))
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.read(|t| t.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.read(|t| t.user_by_email(email))
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        self.check(FailPoint::UpdateUser)?;
        self.write(|t| t.update_user(user)).await
    }

    async fn find_account(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<Account>> {
        self.read(|t| {
            t.accounts
                .values()
                .find(|a| a.provider == provider && a.provider_id == provider_id)
                .cloned()
        })
    }

    async fn find_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>> {
        self.read(|t| t.workspaces.get(&id).cloned())
    }

    async fn find_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Member>> {
        self.read(|t| t.member(user_id, workspace_id))
    }

    async fn find_role(&self, id: RoleId) -> StoreResult<Option<RoleRecord>> {
        self.read(|t| t.roles.get(&id).cloned())
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        self.read(|t| {
            let mut roles: Vec<RoleRecord> = t.roles.values().cloned().collect();
            roles.sort_by(|a, b| a.name.cmp(&b.name));
            roles
        })
    }

    async fn list_memberships(&self, user_id: UserId) -> StoreResult<Vec<(Member, Workspace)>> {
        self.read(|t| {
            let mut rows: Vec<(Member, Workspace)> = t
                .members
                .values()
                .filter(|m| m.user_id == user_id)
                .filter_map(|m| {
                    t.workspaces
                        .get(&m.workspace_id)
                        .map(|w| (m.clone(), w.clone()))
                })
                .collect();
            rows.sort_by_key(|(m, _)| (m.joined_at, m.id));
            rows
        })
    }

    async fn list_members(&self, workspace_id: WorkspaceId) -> StoreResult<Vec<MemberDetails>> {
        self.read(|t| {
            let mut rows: Vec<MemberDetails> = t
                .members
                .values()
                .filter(|m| m.workspace_id == workspace_id)
                .filter_map(|m| {
                    let user = t.users.get(&m.user_id)?;
                    Some(MemberDetails {
                        member: m.clone(),
                        user: user.summary(),
                        role: t.roles.get(&m.role_id).and_then(RoleRecord::role_name),
                    })
                })
                .collect();
            rows.sort_by_key(|d| (d.member.joined_at, d.member.id));
            rows
        })
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        self.write(|t| {
            put(&mut t.projects, project);
            Ok(())
        })
        .await
    }

    async fn find_project(
        &self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Project>> {
        self.read(|t| t.project(id, workspace_id))
    }

    async fn count_projects(&self, workspace_id: WorkspaceId) -> StoreResult<u64> {
        self.read(|t| {
            t.projects
                .values()
                .filter(|p| p.workspace_id == workspace_id)
                .count() as u64
        })
    }

    async fn list_projects(
        &self,
        workspace_id: WorkspaceId,
        skip: u64,
        limit: u64,
    ) -> StoreResult<Vec<Project>> {
        self.read(|t| {
            let mut rows: Vec<&Project> = t
                .projects
                .values()
                .filter(|p| p.workspace_id == workspace_id)
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            rows.into_iter()
                .skip(clamp(skip))
                .take(clamp(limit))
                .cloned()
                .collect()
        })
    }

    async fn update_project(&self, project: &Project) -> StoreResult<()> {
        self.write(|t| {
            replace(&mut t.projects, project);
            Ok(())
        })
        .await
    }

    async fn project_analytics(
        &self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
        now: DateTime<Utc>,
    ) -> StoreResult<ProjectAnalytics> {
        self.read(|t| ProjectAnalytics::from_tasks(t.project_tasks(project_id, workspace_id), now))
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        self.write(|t| t.insert_task(task)).await
    }

    async fn list_tasks(
        &self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Vec<Task>> {
        self.read(|t| {
            let mut rows: Vec<Task> = t.project_tasks(project_id, workspace_id).cloned().collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            rows
        })
    }
}

struct InMemoryTx {
    store: InMemoryStore,
    working: Tables,
    _writer: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.working.user_by_email(email))
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        self.store.check(FailPoint::InsertUser)?;
        self.working.insert_user(user)
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        self.store.check(FailPoint::UpdateUser)?;
        self.working.update_user(user)
    }

    async fn insert_account(&mut self, account: &Account) -> StoreResult<()> {
        self.store.check(FailPoint::InsertAccount)?;
        self.working.insert_account(account)
    }

    async fn insert_workspace(&mut self, workspace: &Workspace) -> StoreResult<()> {
        self.store.check(FailPoint::InsertWorkspace)?;
        self.working.insert_workspace(workspace)
    }

    async fn invite_code_taken(&mut self, code: &str) -> StoreResult<bool> {
        Ok(self.working.workspaces.values().any(|w| w.invite_code == code))
    }

    async fn find_role_by_name(&mut self, name: RoleName) -> StoreResult<Option<RoleRecord>> {
        Ok(self.working.role_by_name(name))
    }

    async fn insert_member(&mut self, member: &Member) -> StoreResult<()> {
        self.store.check(FailPoint::InsertMember)?;
        self.working.insert_member(member)
    }

    async fn find_project(
        &mut self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Project>> {
        Ok(self.working.project(id, workspace_id))
    }

    async fn delete_tasks(
        &mut self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<u64> {
        self.store.check(FailPoint::DeleteTasks)?;
        Ok(self.working.delete_tasks(project_id, workspace_id))
    }

    async fn delete_project(
        &mut self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<u64> {
        self.store.check(FailPoint::DeleteProject)?;
        Ok(self.working.delete_project(id, workspace_id))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.store.check(FailPoint::Commit)?;
        let InMemoryTx {
            store,
            working,
            _writer,
        } = *self;
        let mut tables = store
            .inner
            .tables
            .write()
            .map_err(|_| StoreError::backend("commit", "lock poisoned"))?;
        *tables = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
