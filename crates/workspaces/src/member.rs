use chrono::{DateTime, Utc};
use serde::Serialize;

use teamflow_auth::RoleName;
use teamflow_core::{Entity, MemberId, RoleId, UserId, WorkspaceId};

use crate::UserSummary;

/// Stored role reference data. `name` stays a string so an unknown value
/// read back from storage resolves to "no role" instead of failing the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
}

impl RoleRecord {
    pub fn new(name: RoleName) -> Self {
        Self {
            id: RoleId::new(),
            name: name.as_str().to_string(),
        }
    }

    pub fn role_name(&self) -> Option<RoleName> {
        self.name.parse().ok()
    }
}

impl Entity for RoleRecord {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}

/// A user's membership in one workspace. At most one per (user, workspace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn join(
        user_id: UserId,
        workspace_id: WorkspaceId,
        role_id: RoleId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MemberId::new(),
            user_id,
            workspace_id,
            role_id,
            joined_at: now,
        }
    }
}

impl Entity for Member {
    type Id = MemberId;

    fn id(&self) -> MemberId {
        self.id
    }
}

/// Member row joined with its user and role, as shown in member listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetails {
    #[serde(flatten)]
    pub member: Member,
    pub user: UserSummary,
    pub role: Option<RoleName>,
}
