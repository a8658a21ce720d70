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
use teamflow_core::WorkspaceId;
use teamflow_infra::services::workspace;

use crate::app::dto::{self, ValidatedJson, parse_id};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/create", post(create_workspace))
        .route("/all", get(list_workspaces))
        .route("/members/:id", get(list_members))
        .route("/:id", get(get_workspace))
}

pub async fn create_workspace(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ValidatedJson(input): ValidatedJson<dto::CreateWorkspaceRequest>,
) -> ApiResult<Response> {
    let workspace = workspace::create_workspace(
        services.store.as_ref(),
        principal.user_id(),
        &input.name,
        input.description,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Workspace created successfully",
            "workspace": workspace,
        })),
    )
        .into_response())
}

pub async fn list_workspaces(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    let workspaces =
        workspace::list_workspaces_for_user(services.store.as_ref(), principal.user_id()).await?;

    Ok(Json(json!({
        "message": "Workspaces retrieved successfully",
        "workspaces": workspaces,
    }))
    .into_response())
}

pub async fn get_workspace(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let workspace_id: WorkspaceId = parse_id("workspaceId", &id)?;
    authz::require_member(&services, &principal, workspace_id).await?;

    let workspace = workspace::get_workspace(services.store.as_ref(), workspace_id).await?;

    Ok(Json(json!({
        "message": "Workspace retrieved successfully",
        "workspace": workspace,
    }))
    .into_response())
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let workspace_id: WorkspaceId = parse_id("workspaceId", &id)?;
    authz::authorize(&services, &principal, workspace_id, &[Permission::ViewOnly]).await?;

    let (members, roles) =
        workspace::list_workspace_members(services.store.as_ref(), workspace_id).await?;

    Ok(Json(json!({
        "message": "Members retrieved successfully",
        "members": members,
        "roles": roles,
    }))
    .into_response())
}
