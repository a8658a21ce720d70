use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde_json::json;

use teamflow_auth::Permission;
use teamflow_core::{ProjectId, WorkspaceId};
use teamflow_infra::services::project;

use crate::app::dto::{self, PaginationQuery, ValidatedJson, parse_id};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/workspace/:workspace_id/create", post(create_project))
        .route("/workspace/:workspace_id/all", get(list_projects))
        .route("/:id/workspace/:workspace_id", get(get_project))
        .route("/:id/workspace/:workspace_id/analytics", get(project_analytics))
        .route("/:id/workspace/:workspace_id/update", put(update_project))
        .route("/:id/workspace/:workspace_id/delete", delete(delete_project))
}

fn project_path(id: &str, workspace_id: &str) -> ApiResult<(ProjectId, WorkspaceId)> {
    Ok((
        parse_id("projectId", id)?,
        parse_id("workspaceId", workspace_id)?,
    ))
}

pub async fn create_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(workspace_id): Path<String>,
    ValidatedJson(input): ValidatedJson<dto::CreateProjectRequest>,
) -> ApiResult<Response> {
    let workspace_id: WorkspaceId = parse_id("workspaceId", &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::CreateProject]).await?;

    let project = project::create_project(
        services.store.as_ref(),
        principal.user_id(),
        workspace_id,
        input,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Project created successfully",
            "project": project,
        })),
    )
        .into_response())
}

pub async fn list_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(workspace_id): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Response> {
    let workspace_id: WorkspaceId = parse_id("workspaceId", &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::ViewOnly]).await?;

    let page = project::list_projects(
        services.store.as_ref(),
        workspace_id,
        query.page_request(),
    )
    .await?;

    Ok(Json(json!({
        "message": "Projects fetched successfully",
        "projects": page.items,
        "pagination": {
            "totalCount": page.total_count,
            "totalPages": page.total_pages,
            "pageSize": page.page_size,
            "pageNumber": page.page_number,
            "skip": page.skip,
            "limit": page.page_size,
        },
    }))
    .into_response())
}

pub async fn get_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, workspace_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (project_id, workspace_id) = project_path(&id, &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::ViewOnly]).await?;

    let project = project::get_project(services.store.as_ref(), workspace_id, project_id).await?;

    Ok(Json(json!({
        "message": "Project fetched successfully",
        "project": project,
    }))
    .into_response())
}

pub async fn project_analytics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, workspace_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (project_id, workspace_id) = project_path(&id, &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::ViewOnly]).await?;

    let analytics = project::project_analytics(
        services.store.as_ref(),
        workspace_id,
        project_id,
        Utc::now(),
    )
    .await?;

    Ok(Json(json!({
        "message": "Project analytics fetched successfully",
        "analytics": analytics,
    }))
    .into_response())
}

pub async fn update_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, workspace_id)): Path<(String, String)>,
    ValidatedJson(patch): ValidatedJson<dto::UpdateProjectRequest>,
) -> ApiResult<Response> {
    let (project_id, workspace_id) = project_path(&id, &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::EditProject]).await?;

    let project =
        project::update_project(services.store.as_ref(), workspace_id, project_id, patch).await?;

    Ok(Json(json!({
        "message": "Project updated successfully",
        "project": project,
    }))
    .into_response())
}

pub async fn delete_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, workspace_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (project_id, workspace_id) = project_path(&id, &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::DeleteProject]).await?;

    project::delete_project(services.store.as_ref(), workspace_id, project_id).await?;

    Ok(Json(json!({ "message": "Project deleted successfully" })).into_response())
}
