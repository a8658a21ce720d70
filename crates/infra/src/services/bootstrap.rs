//! First sign-in provisioning and local credentials.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use teamflow_auth::{RoleName, hash_password, verify_password};
use teamflow_core::DomainError;
use teamflow_workspaces::{
    Account, Member, NewUser, Provider, User, Workspace, generate_invite_code, normalize_email,
};

use super::workspace::unique_invite_code;
use super::{ServiceResult, finish};
use crate::store::{Store, StoreTx};

const MAX_DISPLAY_NAME_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 255;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Identity asserted by an external provider after a successful handshake.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub provider: Provider,
    pub provider_id: String,
    pub display_name: String,
    pub picture: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocalRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Return the user owning `profile.email`, creating the user, provider
/// account, default workspace and owner membership in one transaction when
/// no such user exists yet.
///
/// An existing user is returned as-is; no account is linked for a provider
/// they have not used before.
#[instrument(skip(store, profile), fields(provider = %profile.provider), err)]
pub async fn login_or_create_account(
    store: &dyn Store,
    profile: OAuthProfile,
) -> ServiceResult<User> {
    let email = profile
        .email
        .as_deref()
        .ok_or_else(|| DomainError::validation("email is required to sign in"))?;
    let email = normalize_email(email)?;

    // Provider display names are not bounded; keep what fits.
    let name: String = match profile.display_name.trim() {
        "" => email.split('@').next().unwrap_or_default(),
        name => name,
    }
    .chars()
    .take(MAX_DISPLAY_NAME_LEN)
    .collect();

    let mut tx = store.begin().await?;
    let result: ServiceResult<User> = async {
        if let Some(existing) = tx.find_user_by_email(&email).await? {
            return Ok(existing);
        }
        let new_user = NewUser {
            name,
            email: email.clone(),
            profile_picture: profile.picture,
            password_hash: None,
        };
        provision(tx.as_mut(), new_user, profile.provider, profile.provider_id, Utc::now()).await
    }
    .await;
    finish(tx, result, "login_or_create_account").await
}

/// Create a local (email/password) user with the same provisioning as a
/// first OAuth sign-in.
#[instrument(skip(store, input), err)]
pub async fn register_local_user(
    store: &dyn Store,
    input: LocalRegistration,
) -> ServiceResult<User> {
    let email = normalize_email(&input.email)?;
    check_password(&input.password)?;
    let password_hash = hash_password(&input.password)?;

    let mut tx = store.begin().await?;
    let result: ServiceResult<User> = async {
        if tx.find_user_by_email(&email).await?.is_some() {
            return Err(DomainError::bad_request("Email already exists").into());
        }
        let new_user = NewUser {
            name: input.name,
            email: email.clone(),
            profile_picture: None,
            password_hash: Some(password_hash),
        };
        provision(tx.as_mut(), new_user, Provider::Email, email.clone(), Utc::now()).await
    }
    .await;
    finish(tx, result, "register_local_user").await
}

/// Check local credentials and record the login.
#[instrument(skip(store, password), err)]
pub async fn verify_local_user(store: &dyn Store, email: &str, password: &str) -> ServiceResult<User> {
    let email = normalize_email(email)
        .map_err(|_| DomainError::not_found(INVALID_CREDENTIALS))?;

    let account = store
        .find_account(Provider::Email, &email)
        .await?
        .ok_or_else(|| DomainError::not_found(INVALID_CREDENTIALS))?;
    let mut user = store
        .find_user(account.user_id)
        .await?
        .ok_or_else(|| DomainError::not_found(INVALID_CREDENTIALS))?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| DomainError::unauthorized(INVALID_CREDENTIALS))?;
    if !verify_password(password, hash)? {
        return Err(DomainError::unauthorized(INVALID_CREDENTIALS).into());
    }

    user.record_login(Utc::now());
    store.update_user(&user).await?;
    Ok(user)
}

fn check_password(password: &str) -> ServiceResult<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(DomainError::validation("password must be at least 8 characters").into());
    }
    if len > MAX_PASSWORD_LEN {
        return Err(DomainError::validation("password must not exceed 255 characters").into());
    }
    Ok(())
}

/// User, account, default workspace, owner membership, current workspace.
async fn provision(
    tx: &mut dyn StoreTx,
    new_user: NewUser,
    provider: Provider,
    provider_id: String,
    now: DateTime<Utc>,
) -> ServiceResult<User> {
    let mut user = User::register(new_user, now)?;
    tx.insert_user(&user).await?;

    tx.insert_account(&Account::link(user.id, provider, provider_id, now))
        .await?;

    let invite_code = unique_invite_code(tx, generate_invite_code).await?;
    let workspace = Workspace::default_for(&user, invite_code, now);
    tx.insert_workspace(&workspace).await?;

    let owner = tx
        .find_role_by_name(RoleName::Owner)
        .await?
        .ok_or_else(|| DomainError::not_found("Owner role not found"))?;
    tx.insert_member(&Member::join(user.id, workspace.id, owner.id, now))
        .await?;

    user.switch_workspace(workspace.id, now);
    tx.update_user(&user).await?;

    info!(user_id = %user.id, workspace_id = %workspace.id, %provider, "provisioned new user");
    Ok(user)
}
