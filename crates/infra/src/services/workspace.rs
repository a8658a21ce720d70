use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use teamflow_auth::RoleName;
use teamflow_core::{DomainError, UserId, WorkspaceId};
use teamflow_workspaces::{Member, MemberDetails, RoleRecord, Workspace, generate_invite_code};

use super::{ServiceResult, finish};

const MAX_INVITE_CODE_ATTEMPTS: usize = 5;
use crate::store::{Store, StoreTx};

/// A workspace together with its member listing.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceWithMembers {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub members: Vec<MemberDetails>,
}

/// Create a workspace owned by `user_id`, make them its OWNER and switch
/// their current workspace to it. Atomic.
#[instrument(skip(store, description), fields(user_id = %user_id), err)]
pub async fn create_workspace(
    store: &dyn Store,
    user_id: UserId,
    name: &str,
    description: Option<String>,
) -> ServiceResult<Workspace> {
    let now = Utc::now();

    let mut tx = store.begin().await?;
    let result: ServiceResult<Workspace> = async {
        let invite_code = unique_invite_code(tx.as_mut(), generate_invite_code).await?;
        let workspace = Workspace::create(user_id, name, description, invite_code, now)?;
        let mut user = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        let owner = tx
            .find_role_by_name(RoleName::Owner)
            .await?
            .ok_or_else(|| DomainError::not_found("Owner role not found"))?;

        tx.insert_workspace(&workspace).await?;
        tx.insert_member(&Member::join(user.id, workspace.id, owner.id, now))
            .await?;

        user.switch_workspace(workspace.id, now);
        tx.update_user(&user).await?;
        Ok(workspace)
    }
    .await;

    let workspace = finish(tx, result, "create_workspace").await?;
    info!(workspace_id = %workspace.id, "workspace created");
    Ok(workspace)
}

/// Draw invite codes until one is not in use inside `tx`.
pub(crate) async fn unique_invite_code(
    tx: &mut dyn StoreTx,
    mut draw: impl FnMut() -> String + Send,
) -> ServiceResult<String> {
    for attempt in 1..=MAX_INVITE_CODE_ATTEMPTS {
        let code = draw();
        if !tx.invite_code_taken(&code).await? {
            return Ok(code);
        }
        warn!(attempt, invite_code = %code, "invite code collision");
    }
    Err(DomainError::conflict("could not allocate a unique invite code").into())
}

/// Every workspace the user is a member of, oldest membership first.
pub async fn list_workspaces_for_user(
    store: &dyn Store,
    user_id: UserId,
) -> ServiceResult<Vec<Workspace>> {
    Ok(store
        .list_memberships(user_id)
        .await?
        .into_iter()
        .map(|(_, workspace)| workspace)
        .collect())
}

pub async fn get_workspace(
    store: &dyn Store,
    workspace_id: WorkspaceId,
) -> ServiceResult<WorkspaceWithMembers> {
    let workspace = store
        .find_workspace(workspace_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Workspace not found"))?;
    let members = store.list_members(workspace_id).await?;
    Ok(WorkspaceWithMembers { workspace, members })
}

/// Members with their user summary and role, plus the role catalogue.
pub async fn list_workspace_members(
    store: &dyn Store,
    workspace_id: WorkspaceId,
) -> ServiceResult<(Vec<MemberDetails>, Vec<RoleRecord>)> {
    let members = store.list_members(workspace_id).await?;
    let roles = store.list_roles().await?;
    Ok((members, roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::services::bootstrap::{OAuthProfile, login_or_create_account};
    use crate::store::{FailPoint, InMemoryStore};
    use teamflow_workspaces::{Provider, User};

    async fn sign_in(store: &InMemoryStore) -> User {
        login_or_create_account(
            store,
            OAuthProfile {
                provider: Provider::Google,
                provider_id: "g-1".into(),
                display_name: "Ana".into(),
                picture: None,
                email: Some("ana@example.com".into()),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_switches_current_workspace() {
        let store = InMemoryStore::with_default_roles();
        let user = sign_in(&store).await;

        let ws = create_workspace(&store, user.id, "Research", Some("R&D".into()))
            .await
            .unwrap();

        let reloaded = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_workspace, Some(ws.id));

        let all = list_workspaces_for_user(&store, user.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|w| w.id == ws.id));
    }

    #[tokio::test]
    async fn taken_invite_code_is_redrawn() {
        let store = InMemoryStore::with_default_roles();
        let mut tx = store.begin().await.unwrap();
        let taken = Workspace::create(UserId::new(), "Taken", None, "aaaa0000".into(), Utc::now())
            .unwrap();
        tx.insert_workspace(&taken).await.unwrap();

        let mut draws = ["aaaa0000", "bbbb1111"].into_iter();
        let code = unique_invite_code(tx.as_mut(), || draws.next().unwrap_or("zzzz9999").to_string())
            .await
            .unwrap();
        assert_eq!(code, "bbbb1111");

        let err = unique_invite_code(tx.as_mut(), || "aaaa0000".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn create_for_unknown_user_is_not_found() {
        let store = InMemoryStore::with_default_roles();
        let err = create_workspace(&store, UserId::new(), "Ghost", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
        assert_eq!(store.counts().workspaces, 0);
    }

    #[tokio::test]
    async fn failed_user_update_rolls_back_workspace() {
        let store = InMemoryStore::with_default_roles();
        let user = sign_in(&store).await;
        store.fail_at(FailPoint::UpdateUser);

        assert!(create_workspace(&store, user.id, "Doomed", None).await.is_err());
        let counts = store.counts();
        assert_eq!((counts.workspaces, counts.members), (1, 1));
    }

    #[tokio::test]
    async fn members_listing_includes_roles() {
        let store = InMemoryStore::with_default_roles();
        let user = sign_in(&store).await;
        let ws_id = user.current_workspace.unwrap();

        let details = get_workspace(&store, ws_id).await.unwrap();
        assert_eq!(details.members.len(), 1);
        assert_eq!(details.members[0].user.email, "ana@example.com");

        let (members, roles) = list_workspace_members(&store, ws_id).await.unwrap();
        assert_eq!(members[0].role, Some(RoleName::Owner));
        assert_eq!(roles.len(), 3);
    }
}
