use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use teamflow_core::{DomainError, ProjectId, UserId, WorkspaceId};
use teamflow_projects::{NewProject, Page, PageRequest, Project, ProjectAnalytics, ProjectPatch};

use super::{ServiceResult, finish};
use crate::store::Store;

const PROJECT_NOT_FOUND: &str = "Project not found or does not belong to the specified workspace";

fn not_found() -> DomainError {
    DomainError::not_found(PROJECT_NOT_FOUND)
}

#[instrument(skip(store, input), fields(workspace_id = %workspace_id, user_id = %user_id), err)]
pub async fn create_project(
    store: &dyn Store,
    user_id: UserId,
    workspace_id: WorkspaceId,
    input: NewProject,
) -> ServiceResult<Project> {
    let project = Project::create(workspace_id, user_id, input, Utc::now())?;
    store.insert_project(&project).await?;
    info!(project_id = %project.id, "project created");
    Ok(project)
}

/// Newest first; `total_pages = ceil(total_count / page_size)`.
pub async fn list_projects(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    page: PageRequest,
) -> ServiceResult<Page<Project>> {
    let total = store.count_projects(workspace_id).await?;
    let items = store
        .list_projects(workspace_id, page.skip(), page.page_size())
        .await?;
    Ok(Page::new(items, total, page))
}

pub async fn get_project(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
) -> ServiceResult<Project> {
    Ok(store
        .find_project(project_id, workspace_id)
        .await?
        .ok_or_else(not_found)?)
}

pub async fn project_analytics(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    now: DateTime<Utc>,
) -> ServiceResult<ProjectAnalytics> {
    get_project(store, workspace_id, project_id).await?;
    Ok(store
        .project_analytics(project_id, workspace_id, now)
        .await?)
}

/// Blank fields in `patch` leave the stored value unchanged.
#[instrument(skip(store, patch), fields(workspace_id = %workspace_id, project_id = %project_id), err)]
pub async fn update_project(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    patch: ProjectPatch,
) -> ServiceResult<Project> {
    let mut project = get_project(store, workspace_id, project_id).await?;
    project.apply_patch(patch, Utc::now())?;
    store.update_project(&project).await?;
    Ok(project)
}

/// Delete a project and every task in it, atomically.
#[instrument(skip(store), fields(workspace_id = %workspace_id, project_id = %project_id), err)]
pub async fn delete_project(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
) -> ServiceResult<Project> {
    let mut tx = store.begin().await?;
    let result: ServiceResult<(Project, u64)> = async {
        let project = tx
            .find_project(project_id, workspace_id)
            .await?
            .ok_or_else(not_found)?;
        let tasks = tx.delete_tasks(project_id, workspace_id).await?;
        tx.delete_project(project_id, workspace_id).await?;
        Ok((project, tasks))
    }
    .await;

    let (project, tasks) = finish(tx, result, "delete_project").await?;
    info!(deleted_tasks = tasks, "project deleted");
    Ok(project)
}
