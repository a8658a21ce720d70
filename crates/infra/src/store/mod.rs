//! Persistence seam for users, workspaces, projects and tasks.
//!
//! Two backends implement the same traits:
//! - [`InMemoryStore`] for tests/dev (supports fault injection)
//! - [`PostgresStore`] for production (sqlx)
//!
//! ## Transactions
//!
//! Multi-write operations go through a [`StoreTx`] handle obtained from
//! [`Store::begin`]. The handle is passed explicitly to every write of the
//! unit of work and ends in exactly one of three ways:
//!
//! - `commit()`: all writes become visible together
//! - `rollback()`: nothing becomes visible
//! - drop without either: same as rollback (scope-exit release)

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use teamflow_auth::RoleName;
use teamflow_core::{ProjectId, RoleId, UserId, WorkspaceId};
use teamflow_projects::{Project, ProjectAnalytics, Task};
use teamflow_workspaces::{Account, Member, MemberDetails, Provider, RoleRecord, User, Workspace};

/// Named points where [`InMemoryStore`] can be told to fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertUser,
    InsertAccount,
    InsertWorkspace,
    InsertMember,
    UpdateUser,
    DeleteTasks,
    DeleteProject,
    Commit,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate {entity}: {detail}")]
    Duplicate { entity: &'static str, detail: String },

    #[error("storage error in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("injected failure at {0:?}")]
    Injected(FailPoint),
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    pub fn is_duplicate(&self, entity: &str) -> bool {
        matches!(self, StoreError::Duplicate { entity: e, .. } if *e == entity)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Reads plus single-row writes that need no transaction.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    async fn find_account(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<Account>>;

    async fn find_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>>;
    async fn find_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Member>>;
    async fn find_role(&self, id: RoleId) -> StoreResult<Option<RoleRecord>>;
    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>>;
    /// Every workspace the user belongs to, with the membership row.
    async fn list_memberships(&self, user_id: UserId) -> StoreResult<Vec<(Member, Workspace)>>;
    async fn list_members(&self, workspace_id: WorkspaceId) -> StoreResult<Vec<MemberDetails>>;

    async fn insert_project(&self, project: &Project) -> StoreResult<()>;
    /// Matches on both id and workspace; a project in another workspace is `None`.
    async fn find_project(
        &self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Project>>;
    async fn count_projects(&self, workspace_id: WorkspaceId) -> StoreResult<u64>;
    /// Newest first (`created_at` desc, then id desc).
    async fn list_projects(
        &self,
        workspace_id: WorkspaceId,
        skip: u64,
        limit: u64,
    ) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, project: &Project) -> StoreResult<()>;
    async fn project_analytics(
        &self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
        now: DateTime<Utc>,
    ) -> StoreResult<ProjectAnalytics>;

    async fn insert_task(&self, task: &Task) -> StoreResult<()>;
    async fn list_tasks(
        &self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Vec<Task>>;
}

/// Writes (and the reads they depend on) inside one atomic unit of work.
#[async_trait]
pub trait StoreTx: Send {
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;
    async fn update_user(&mut self, user: &User) -> StoreResult<()>;
    async fn insert_account(&mut self, account: &Account) -> StoreResult<()>;

    async fn insert_workspace(&mut self, workspace: &Workspace) -> StoreResult<()>;
    async fn invite_code_taken(&mut self, code: &str) -> StoreResult<bool>;
    async fn find_role_by_name(&mut self, name: RoleName) -> StoreResult<Option<RoleRecord>>;
    /// Fails with `Duplicate` if the user is already a member of the workspace.
    async fn insert_member(&mut self, member: &Member) -> StoreResult<()>;

    async fn find_project(
        &mut self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Project>>;
    /// Returns the number of tasks removed.
    async fn delete_tasks(
        &mut self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<u64>;
    async fn delete_project(
        &mut self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
