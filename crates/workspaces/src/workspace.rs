use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use teamflow_core::{DomainError, DomainResult, Entity, UserId, WorkspaceId};

use crate::User;

const INVITE_CODE_LEN: usize = 8;
const MAX_NAME_LEN: usize = 255;

/// Tenant container: owns projects and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn create(
        owner_id: UserId,
        name: &str,
        description: Option<String>,
        invite_code: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("workspace name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(
                "workspace name must not exceed 255 characters",
            ));
        }

        Ok(Self {
            id: WorkspaceId::new(),
            name: name.to_string(),
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            owner_id,
            invite_code,
            created_at: now,
            updated_at: now,
        })
    }

    /// The workspace provisioned for a user on first sign-in.
    pub fn default_for(owner: &User, invite_code: String, now: DateTime<Utc>) -> Self {
        Self {
            id: WorkspaceId::new(),
            name: "My Workspace".to_string(),
            description: Some(format!("Workspace for {}", owner.name)),
            owner_id: owner.id,
            invite_code,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Workspace {
    type Id = WorkspaceId;

    fn id(&self) -> WorkspaceId {
        self.id
    }
}

/// Random 8-character lowercase hex invite code.
pub fn generate_invite_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(INVITE_CODE_LEN);
    code
}
