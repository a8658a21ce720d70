use chrono::{DateTime, Utc};
use serde::Serialize;

use teamflow_core::{DomainError, DomainResult, Entity, UserId, WorkspaceId};

const MAX_EMAIL_LEN: usize = 255;
const MAX_NAME_LEN: usize = 255;

/// A person who can sign in and belong to workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub current_workspace: Option<WorkspaceId>,
    /// Argon2 PHC string; only local (email/password) users have one.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`User::register`].
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub password_hash: Option<String>,
}

impl User {
    pub fn register(input: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation("name must not exceed 255 characters"));
        }

        Ok(Self {
            id: UserId::new(),
            name: name.to_string(),
            email: normalize_email(&input.email)?,
            profile_picture: input.profile_picture.filter(|p| !p.is_empty()),
            current_workspace: None,
            password_hash: input.password_hash,
            last_login: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn switch_workspace(&mut self, workspace_id: WorkspaceId, now: DateTime<Utc>) {
        self.current_workspace = Some(workspace_id);
        self.updated_at = now;
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login = Some(now);
        self.updated_at = now;
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Public projection of a user, embedded in member listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

/// Canonical form used for uniqueness: trimmed and lowercased.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(DomainError::validation("email must not exceed 255 characters"));
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(DomainError::validation("Invalid email address")),
    }
}
