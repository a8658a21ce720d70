use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use teamflow_auth::Permission;
use teamflow_core::{ProjectId, WorkspaceId};
use teamflow_infra::services::task;

use crate::app::dto::{self, ValidatedJson, parse_id};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/project/:project_id/workspace/:workspace_id/create", post(create_task))
        .route("/project/:project_id/workspace/:workspace_id/all", get(list_tasks))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((project_id, workspace_id)): Path<(String, String)>,
    ValidatedJson(input): ValidatedJson<dto::CreateTaskRequest>,
) -> ApiResult<Response> {
    let project_id: ProjectId = parse_id("projectId", &project_id)?;
    let workspace_id: WorkspaceId = parse_id("workspaceId", &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::CreateTask]).await?;

    let task = task::create_task(
        services.store.as_ref(),
        services.task_codes.as_ref(),
        principal.user_id(),
        workspace_id,
        project_id,
        input,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Task created successfully",
            "task": task,
        })),
    )
        .into_response())
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((project_id, workspace_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let project_id: ProjectId = parse_id("projectId", &project_id)?;
    let workspace_id: WorkspaceId = parse_id("workspaceId", &workspace_id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::ViewOnly]).await?;

    let tasks = task::list_project_tasks(services.store.as_ref(), workspace_id, project_id).await?;

    Ok(Json(json!({
        "message": "All tasks fetched successfully",
        "tasks": tasks,
    }))
    .into_response())
}
