//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / RowNotFound / other | N/A | `Backend` |
//!
//! The schema is created idempotently by [`PostgresStore::migrate`], which also
//! seeds one role row per [`RoleName`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use teamflow_auth::RoleName;
use teamflow_core::{
    AccountId, MemberId, ProjectId, RoleId, TaskId, UserId, WorkspaceId,
};
use teamflow_projects::{Project, ProjectAnalytics, Task, TaskPriority, TaskStatus};
use teamflow_workspaces::{
    Account, Member, MemberDetails, Provider, RoleRecord, User, UserSummary, Workspace,
};

use super::{Store, StoreError, StoreResult, StoreTx};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id                UUID PRIMARY KEY,
    name              TEXT NOT NULL,
    email             TEXT NOT NULL UNIQUE,
    profile_picture   TEXT,
    current_workspace UUID,
    password_hash     TEXT,
    last_login        TIMESTAMPTZ,
    created_at        TIMESTAMPTZ NOT NULL,
    updated_at        TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id          UUID PRIMARY KEY,
    user_id     UUID NOT NULL REFERENCES users (id),
    provider    TEXT NOT NULL,
    provider_id TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    UNIQUE (provider, provider_id)
);

CREATE TABLE IF NOT EXISTS workspaces (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    owner_id    UUID NOT NULL REFERENCES users (id),
    invite_code TEXT NOT NULL UNIQUE,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS roles (
    id   UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS members (
    id           UUID PRIMARY KEY,
    user_id      UUID NOT NULL REFERENCES users (id),
    workspace_id UUID NOT NULL REFERENCES workspaces (id),
    role_id      UUID NOT NULL REFERENCES roles (id),
    joined_at    TIMESTAMPTZ NOT NULL,
    UNIQUE (user_id, workspace_id)
);

CREATE TABLE IF NOT EXISTS projects (
    id           UUID PRIMARY KEY,
    workspace_id UUID NOT NULL REFERENCES workspaces (id),
    created_by   UUID NOT NULL REFERENCES users (id),
    name         TEXT NOT NULL,
    description  TEXT,
    emoji        TEXT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS projects_workspace_created_idx
    ON projects (workspace_id, created_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS tasks (
    id           UUID PRIMARY KEY,
    task_code    TEXT NOT NULL UNIQUE,
    title        TEXT NOT NULL,
    description  TEXT,
    project_id   UUID NOT NULL REFERENCES projects (id),
    workspace_id UUID NOT NULL REFERENCES workspaces (id),
    assigned_to  UUID REFERENCES users (id),
    created_by   UUID NOT NULL REFERENCES users (id),
    due_date     TIMESTAMPTZ,
    status       TEXT NOT NULL,
    priority     TEXT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS tasks_project_idx ON tasks (project_id, workspace_id);
"#;

const USER_COLUMNS: &str = "id, name, email, profile_picture, current_workspace, password_hash, \
                            last_login, created_at, updated_at";
const WORKSPACE_COLUMNS: &str = "id, name, description, owner_id, invite_code, created_at, updated_at";
const PROJECT_COLUMNS: &str =
    "id, workspace_id, created_by, name, description, emoji, created_at, updated_at";
const TASK_COLUMNS: &str = "id, task_code, title, description, project_id, workspace_id, \
                            assigned_to, created_by, due_date, status, priority, created_at, updated_at";

/// Postgres-backed store. Cheap to clone; the pool is shared.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables if missing and seed role reference data.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_schema", e))?;

        for name in RoleName::ALL {
            sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
                .bind(Uuid::now_v7())
                .bind(name.as_str())
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("seed_roles", e))?;
        }

        tracing::info!("database schema ready");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries shared by the pool and transaction paths
// ─────────────────────────────────────────────────────────────────────────────

async fn select_user_by_id<'e, E>(exec: E, id: UserId) -> StoreResult<Option<User>>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id.as_uuid())
        .fetch_optional(exec)
        .await
        .map_err(|e| map_sqlx_error("find_user", e))?;
    row.map(|r| decode::<UserRow>(&r).map(User::from)).transpose()
}

async fn select_user_by_email<'e, E>(exec: E, email: &str) -> StoreResult<Option<User>>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(exec)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
    row.map(|r| decode::<UserRow>(&r).map(User::from)).transpose()
}

async fn write_user_update<'e, E>(exec: E, user: &User) -> StoreResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET name = $2, email = $3, profile_picture = $4, current_workspace = $5,
            password_hash = $6, last_login = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(user.id.as_uuid())
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.profile_picture)
    .bind(user.current_workspace.map(Uuid::from))
    .bind(&user.password_hash)
    .bind(user.last_login)
    .bind(user.updated_at)
    .execute(exec)
    .await
    .map_err(|e| map_write_error("user", "update_user", e))?;
    Ok(())
}

async fn select_project<'e, E>(
    exec: E,
    id: ProjectId,
    workspace_id: WorkspaceId,
) -> StoreResult<Option<Project>>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND workspace_id = $2"
    ))
    .bind(id.as_uuid())
    .bind(workspace_id.as_uuid())
    .fetch_optional(exec)
    .await
    .map_err(|e| map_sqlx_error("find_project", e))?;
    row.map(|r| decode::<ProjectRow>(&r).map(Project::from)).transpose()
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        select_user_by_id(&*self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        select_user_by_email(&*self.pool, email).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> StoreResult<()> {
        write_user_update(&*self.pool, user).await
    }

    async fn find_account(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, user_id, provider, provider_id, created_at FROM accounts \
             WHERE provider = $1 AND provider_id = $2",
        )
        .bind(provider.as_str())
        .bind(provider_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_account", e))?;
        row.map(|r| decode::<AccountRow>(&r)?.into_account())
            .transpose()
    }

    async fn find_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>> {
        let row = sqlx::query(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_workspace", e))?;
        row.map(|r| decode::<WorkspaceRow>(&r).map(Workspace::from))
            .transpose()
    }

    async fn find_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Member>> {
        let row = sqlx::query(
            "SELECT id, user_id, workspace_id, role_id, joined_at FROM members \
             WHERE user_id = $1 AND workspace_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_member", e))?;
        row.map(|r| decode::<MemberRow>(&r).map(Member::from))
            .transpose()
    }

    async fn find_role(&self, id: RoleId) -> StoreResult<Option<RoleRecord>> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?;
        row.map(|r| decode::<RoleRow>(&r).map(RoleRecord::from))
            .transpose()
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.iter()
            .map(|r| decode::<RoleRow>(r).map(RoleRecord::from))
            .collect()
    }

    async fn list_memberships(&self, user_id: UserId) -> StoreResult<Vec<(Member, Workspace)>> {
        let rows = sqlx::query(
            r#"
            SELECT
                m.id AS member_id, m.role_id, m.joined_at, m.user_id,
                w.id, w.name, w.description, w.owner_id, w.invite_code, w.created_at, w.updated_at
            FROM members m
            JOIN workspaces w ON w.id = m.workspace_id
            WHERE m.user_id = $1
            ORDER BY m.joined_at, m.id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_memberships", e))?;

        rows.iter()
            .map(|r| {
                let workspace = Workspace::from(decode::<WorkspaceRow>(r)?);
                let member = Member {
                    id: MemberId::from_uuid(get(r, "member_id")?),
                    user_id: UserId::from_uuid(get(r, "user_id")?),
                    workspace_id: workspace.id,
                    role_id: RoleId::from_uuid(get(r, "role_id")?),
                    joined_at: get(r, "joined_at")?,
                };
                Ok((member, workspace))
            })
            .collect()
    }

    async fn list_members(&self, workspace_id: WorkspaceId) -> StoreResult<Vec<MemberDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT
                m.id, m.user_id, m.workspace_id, m.role_id, m.joined_at,
                u.name AS user_name, u.email AS user_email,
                u.profile_picture AS user_profile_picture,
                r.name AS role_name
            FROM members m
            JOIN users u ON u.id = m.user_id
            LEFT JOIN roles r ON r.id = m.role_id
            WHERE m.workspace_id = $1
            ORDER BY m.joined_at, m.id
            "#,
        )
        .bind(workspace_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_members", e))?;

        rows.iter()
            .map(|r| {
                let member = Member::from(decode::<MemberRow>(r)?);
                let role: Option<String> = get(r, "role_name")?;
                Ok(MemberDetails {
                    user: UserSummary {
                        id: member.user_id,
                        name: get(r, "user_name")?,
                        email: get(r, "user_email")?,
                        profile_picture: get(r, "user_profile_picture")?,
                    },
                    role: role.and_then(|name| name.parse().ok()),
                    member,
                })
            })
            .collect()
    }

    #[instrument(skip(self, project), fields(project_id = %project.id, workspace_id = %project.workspace_id), err)]
    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, workspace_id, created_by, name, description, emoji, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.workspace_id.as_uuid())
        .bind(project.created_by.as_uuid())
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.emoji)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_write_error("project", "insert_project", e))?;
        Ok(())
    }

    async fn find_project(
        &self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Project>> {
        select_project(&*self.pool, id, workspace_id).await
    }

    async fn count_projects(&self, workspace_id: WorkspaceId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM projects WHERE workspace_id = $1")
            .bind(workspace_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_projects", e))?;
        let total: i64 = get(&row, "total")?;
        Ok(total as u64)
    }

    async fn list_projects(
        &self,
        workspace_id: WorkspaceId,
        skip: u64,
        limit: u64,
    ) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE workspace_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(workspace_id.as_uuid())
        .bind(to_i64(limit))
        .bind(to_i64(skip))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_projects", e))?;
        rows.iter()
            .map(|r| decode::<ProjectRow>(r).map(Project::from))
            .collect()
    }

    #[instrument(skip(self, project), fields(project_id = %project.id), err)]
    async fn update_project(&self, project: &Project) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE projects SET name = $3, description = $4, emoji = $5, updated_at = $6
            WHERE id = $1 AND workspace_id = $2
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.workspace_id.as_uuid())
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.emoji)
        .bind(project.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_project", e))?;
        Ok(())
    }

    async fn project_analytics(
        &self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
        now: DateTime<Utc>,
    ) -> StoreResult<ProjectAnalytics> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_tasks,
                COUNT(*) FILTER (WHERE status <> 'DONE' AND due_date < $3) AS overdue_tasks,
                COUNT(*) FILTER (WHERE status = 'DONE') AS completed_tasks
            FROM tasks
            WHERE project_id = $1 AND workspace_id = $2
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("project_analytics", e))?;

        Ok(ProjectAnalytics {
            total_tasks: get::<i64>(&row, "total_tasks")? as u64,
            overdue_tasks: get::<i64>(&row, "overdue_tasks")? as u64,
            completed_tasks: get::<i64>(&row, "completed_tasks")? as u64,
        })
    }

    #[instrument(skip(self, task), fields(task_code = %task.task_code, project_id = %task.project_id), err)]
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(task.id.as_uuid())
        .bind(&task.task_code)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.project_id.as_uuid())
        .bind(task.workspace_id.as_uuid())
        .bind(task.assigned_to.map(Uuid::from))
        .bind(task.created_by.as_uuid())
        .bind(task.due_date)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_write_error("task", "insert_task", e))?;
        Ok(())
    }

    async fn list_tasks(
        &self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 AND workspace_id = $2 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(project_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tasks", e))?;
        rows.iter()
            .map(|r| decode::<TaskRow>(r)?.into_task())
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps a sqlx transaction; dropping it without commit rolls back.
struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        select_user_by_id(&mut *self.tx, id).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        select_user_by_email(&mut *self.tx, email).await
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.profile_picture)
        .bind(user.current_workspace.map(Uuid::from))
        .bind(&user.password_hash)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error("user", "insert_user", e))?;
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        write_user_update(&mut *self.tx, user).await
    }

    async fn insert_account(&mut self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, user_id, provider, provider_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(account.id.as_uuid())
        .bind(account.user_id.as_uuid())
        .bind(account.provider.as_str())
        .bind(&account.provider_id)
        .bind(account.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error("account", "insert_account", e))?;
        Ok(())
    }

    async fn insert_workspace(&mut self, workspace: &Workspace) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO workspaces ({WORKSPACE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(workspace.id.as_uuid())
        .bind(&workspace.name)
        .bind(&workspace.description)
        .bind(workspace.owner_id.as_uuid())
        .bind(&workspace.invite_code)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error("workspace", "insert_workspace", e))?;
        Ok(())
    }

    async fn invite_code_taken(&mut self, code: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM workspaces WHERE invite_code = $1)")
            .bind(code)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("invite_code_taken", e))
    }

    async fn find_role_by_name(&mut self, name: RoleName) -> StoreResult<Option<RoleRecord>> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        row.map(|r| decode::<RoleRow>(&r).map(RoleRecord::from))
            .transpose()
    }

    async fn insert_member(&mut self, member: &Member) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO members (id, user_id, workspace_id, role_id, joined_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(member.id.as_uuid())
        .bind(member.user_id.as_uuid())
        .bind(member.workspace_id.as_uuid())
        .bind(member.role_id.as_uuid())
        .bind(member.joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error("member", "insert_member", e))?;
        Ok(())
    }

    async fn find_project(
        &mut self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Option<Project>> {
        select_project(&mut *self.tx, id, workspace_id).await
    }

    async fn delete_tasks(
        &mut self,
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<u64> {
        let done = sqlx::query("DELETE FROM tasks WHERE project_id = $1 AND workspace_id = $2")
            .bind(project_id.as_uuid())
            .bind(workspace_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_tasks", e))?;
        Ok(done.rows_affected())
    }

    async fn delete_project(
        &mut self,
        id: ProjectId,
        workspace_id: WorkspaceId,
    ) -> StoreResult<u64> {
        let done = sqlx::query("DELETE FROM projects WHERE id = $1 AND workspace_id = $2")
            .bind(id.as_uuid())
            .bind(workspace_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_project", e))?;
        Ok(done.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::backend(
            operation,
            format!(
                "database error ({}): {}",
                db_err.code().as_deref().unwrap_or("unknown"),
                db_err.message()
            ),
        ),
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        sqlx::Error::RowNotFound => StoreError::backend(operation, "unexpected row not found"),
        other => StoreError::backend(operation, other.to_string()),
    }
}

/// Like [`map_sqlx_error`], but unique violations become `Duplicate`.
fn map_write_error(entity: &'static str, operation: &'static str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        let detail = match &err {
            sqlx::Error::Database(db_err) => db_err
                .constraint()
                .map(str::to_string)
                .unwrap_or_else(|| db_err.message().to_string()),
            _ => err.to_string(),
        };
        return StoreError::Duplicate { entity, detail };
    }
    map_sqlx_error(operation, err)
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn decode<T>(row: &PgRow) -> StoreResult<T>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    T::from_row(row).map_err(|e| StoreError::backend("decode_row", e.to_string()))
}

fn get<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::backend("decode_row", format!("{column}: {e}")))
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLx row types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    profile_picture: Option<String>,
    current_workspace: Option<Uuid>,
    password_hash: Option<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            profile_picture: row.try_get("profile_picture")?,
            current_workspace: row.try_get("current_workspace")?,
            password_hash: row.try_get("password_hash")?,
            last_login: row.try_get("last_login")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            profile_picture: row.profile_picture,
            current_workspace: row.current_workspace.map(WorkspaceId::from_uuid),
            password_hash: row.password_hash,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct AccountRow {
    id: Uuid,
    user_id: Uuid,
    provider: String,
    provider_id: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            provider: row.try_get("provider")?,
            provider_id: row.try_get("provider_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl AccountRow {
    fn into_account(self) -> StoreResult<Account> {
        Ok(Account {
            id: AccountId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            provider: self
                .provider
                .parse()
                .map_err(|e: teamflow_core::DomainError| StoreError::backend("decode_row", e.to_string()))?,
            provider_id: self.provider_id,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug)]
struct WorkspaceRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    owner_id: Uuid,
    invite_code: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for WorkspaceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(WorkspaceRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            owner_id: row.try_get("owner_id")?,
            invite_code: row.try_get("invite_code")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<WorkspaceRow> for Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Workspace {
            id: WorkspaceId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            owner_id: UserId::from_uuid(row.owner_id),
            invite_code: row.invite_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct RoleRow {
    id: Uuid,
    name: String,
}

impl<'r> FromRow<'r, PgRow> for RoleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RoleRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

impl From<RoleRow> for RoleRecord {
    fn from(row: RoleRow) -> Self {
        RoleRecord {
            id: RoleId::from_uuid(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug)]
struct MemberRow {
    id: Uuid,
    user_id: Uuid,
    workspace_id: Uuid,
    role_id: Uuid,
    joined_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MemberRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MemberRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            workspace_id: row.try_get("workspace_id")?,
            role_id: row.try_get("role_id")?,
            joined_at: row.try_get("joined_at")?,
        })
    }
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: MemberId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            workspace_id: WorkspaceId::from_uuid(row.workspace_id),
            role_id: RoleId::from_uuid(row.role_id),
            joined_at: row.joined_at,
        }
    }
}

#[derive(Debug)]
struct ProjectRow {
    id: Uuid,
    workspace_id: Uuid,
    created_by: Uuid,
    name: String,
    description: Option<String>,
    emoji: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProjectRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProjectRow {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            created_by: row.try_get("created_by")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            emoji: row.try_get("emoji")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: ProjectId::from_uuid(row.id),
            workspace_id: WorkspaceId::from_uuid(row.workspace_id),
            created_by: UserId::from_uuid(row.created_by),
            name: row.name,
            description: row.description,
            emoji: row.emoji,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct TaskRow {
    id: Uuid,
    task_code: String,
    title: String,
    description: Option<String>,
    project_id: Uuid,
    workspace_id: Uuid,
    assigned_to: Option<Uuid>,
    created_by: Uuid,
    due_date: Option<DateTime<Utc>>,
    status: String,
    priority: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TaskRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TaskRow {
            id: row.try_get("id")?,
            task_code: row.try_get("task_code")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            project_id: row.try_get("project_id")?,
            workspace_id: row.try_get("workspace_id")?,
            assigned_to: row.try_get("assigned_to")?,
            created_by: row.try_get("created_by")?,
            due_date: row.try_get("due_date")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TaskRow {
    fn into_task(self) -> StoreResult<Task> {
        let decode_err = |e: teamflow_core::DomainError| StoreError::backend("decode_row", e.to_string());
        Ok(Task {
            id: TaskId::from_uuid(self.id),
            task_code: self.task_code,
            title: self.title,
            description: self.description,
            project_id: ProjectId::from_uuid(self.project_id),
            workspace_id: WorkspaceId::from_uuid(self.workspace_id),
            assigned_to: self.assigned_to.map(UserId::from_uuid),
            created_by: UserId::from_uuid(self.created_by),
            due_date: self.due_date,
            status: TaskStatus::parse(&self.status).map_err(decode_err)?,
            priority: TaskPriority::parse(&self.priority).map_err(decode_err)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
