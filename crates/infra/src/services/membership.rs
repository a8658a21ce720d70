use tracing::instrument;

use teamflow_auth::{Permission, RoleName, role_guard};
use teamflow_core::{DomainError, UserId, WorkspaceId};

use super::ServiceResult;
use crate::store::Store;

/// Resolve the caller's role in a workspace.
///
/// - `NotFound` if the workspace does not exist
/// - `Unauthorized` if the user is not a member
/// - `Ok(None)` if the member's role record is missing or unrecognised
#[instrument(skip(store), fields(user_id = %user_id, workspace_id = %workspace_id), err)]
pub async fn member_role_in_workspace(
    store: &dyn Store,
    user_id: UserId,
    workspace_id: WorkspaceId,
) -> ServiceResult<Option<RoleName>> {
    store
        .find_workspace(workspace_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Workspace not found"))?;

    let member = store
        .find_member(user_id, workspace_id)
        .await?
        .ok_or_else(|| DomainError::unauthorized("User is not a member of the workspace"))?;

    let role = store.find_role(member.role_id).await?;
    Ok(role.and_then(|r| r.role_name()))
}

/// Membership gate followed by the role guard.
pub async fn require_permissions(
    store: &dyn Store,
    user_id: UserId,
    workspace_id: WorkspaceId,
    required: &[Permission],
) -> ServiceResult<Option<RoleName>> {
    let role = member_role_in_workspace(store, user_id, workspace_id).await?;
    role_guard(role, required)?;
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::services::bootstrap::{OAuthProfile, login_or_create_account};
    use crate::services::workspace::create_workspace;
    use crate::store::{InMemoryStore, Store};
    use chrono::Utc;
    use teamflow_auth::AuthzError;
    use teamflow_workspaces::{Member, Provider};

    async fn sign_in(store: &InMemoryStore, email: &str) -> teamflow_workspaces::User {
        login_or_create_account(
            store,
            OAuthProfile {
                provider: Provider::Google,
                provider_id: format!("google-{email}"),
                display_name: "Sam".into(),
                picture: None,
                email: Some(email.into()),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn owner_of_default_workspace_resolves_to_owner() {
        let store = InMemoryStore::with_default_roles();
        let user = sign_in(&store, "sam@example.com").await;
        let ws = user.current_workspace.unwrap();

        let role = member_role_in_workspace(&store, user.id, ws).await.unwrap();
        assert_eq!(role, Some(RoleName::Owner));
    }

    #[tokio::test]
    async fn non_member_is_unauthorized_even_if_workspace_exists() {
        let store = InMemoryStore::with_default_roles();
        let owner = sign_in(&store, "owner@example.com").await;
        let outsider = sign_in(&store, "outsider@example.com").await;

        let err = member_role_in_workspace(&store, outsider.id, owner.current_workspace.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn unknown_workspace_is_not_found() {
        let store = InMemoryStore::with_default_roles();
        let user = sign_in(&store, "a@example.com").await;

        let err = member_role_in_workspace(&store, user.id, WorkspaceId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn require_permissions_runs_the_guard() {
        let store = InMemoryStore::with_default_roles();
        let user = sign_in(&store, "b@example.com").await;
        let ws = create_workspace(&store, user.id, "Second", None).await.unwrap();

        assert!(
            require_permissions(&store, user.id, ws.id, &[Permission::DeleteWorkspace])
                .await
                .is_ok()
        );

        let teammate = sign_in(&store, "c@example.com").await;
        let mut tx = store.begin().await.unwrap();
        let member_role = tx.find_role_by_name(RoleName::Member).await.unwrap().unwrap();
        tx.insert_member(&Member::join(teammate.id, ws.id, member_role.id, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            require_permissions(&store, teammate.id, ws.id, &[Permission::ViewOnly])
                .await
                .unwrap(),
            Some(RoleName::Member)
        );
        let err = require_permissions(&store, teammate.id, ws.id, &[Permission::DeleteProject])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authz(AuthzError::Forbidden { .. })));
    }
}
