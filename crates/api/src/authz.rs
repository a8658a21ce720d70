//! API-side authorization guard for workspace-scoped routes.
//!
//! Runs membership resolution and the role guard before any service call,
//! so a denied request never reaches a mutation.

use teamflow_auth::{Permission, RoleName};
use teamflow_core::WorkspaceId;
use teamflow_infra::services::membership;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Require membership in `workspace_id` plus every permission in `required`.
pub async fn authorize(
    services: &AppServices,
    principal: &PrincipalContext,
    workspace_id: WorkspaceId,
    required: &[Permission],
) -> ApiResult<Option<RoleName>> {
    let role = membership::require_permissions(
        services.store.as_ref(),
        principal.user_id(),
        workspace_id,
        required,
    )
    .await?;
    Ok(role)
}

/// Membership only; any role will do.
pub async fn require_member(
    services: &AppServices,
    principal: &PrincipalContext,
    workspace_id: WorkspaceId,
) -> ApiResult<Option<RoleName>> {
    let role = membership::member_role_in_workspace(
        services.store.as_ref(),
        principal.user_id(),
        workspace_id,
    )
    .await?;
    Ok(role)
}
