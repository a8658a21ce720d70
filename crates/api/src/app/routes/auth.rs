use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use teamflow_core::DomainError;
use teamflow_infra::services::bootstrap;
use teamflow_workspaces::User;

use crate::app::dto::{self, OAuthCallbackQuery, ValidatedJson};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::{AppServices, IdentityError};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google/callback", get(google_callback))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ValidatedJson(input): ValidatedJson<dto::RegisterRequest>,
) -> ApiResult<Response> {
    let user = bootstrap::register_local_user(services.store.as_ref(), input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": user,
        })),
    )
        .into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ValidatedJson(credentials): ValidatedJson<dto::LoginRequest>,
) -> ApiResult<Response> {
    let user = bootstrap::verify_local_user(
        services.store.as_ref(),
        &credentials.email,
        &credentials.password,
    )
    .await?;

    signed_in(&services, user)
}

/// Landing point of the Google redirect: exchange the code, provision the
/// user on first sign-in, hand back a session token.
pub async fn google_callback(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<OAuthCallbackQuery>,
) -> ApiResult<Response> {
    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::field("code", "code is required"))?;

    let provider = services.identity.clone().ok_or_else(|| {
        ApiError::status(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            "Google sign-in is not configured",
        )
    })?;

    let profile = provider.exchange(code.trim()).await.map_err(|e| match e {
        IdentityError::Rejected(msg) => ApiError::from(DomainError::unauthorized(msg)),
        IdentityError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "identity provider unavailable");
            ApiError::status(StatusCode::BAD_GATEWAY, "PROVIDER_UNAVAILABLE", msg)
        }
    })?;

    if profile.provider_id.trim().is_empty() {
        return Err(DomainError::not_found("Google ID not found in profile").into());
    }

    let user = bootstrap::login_or_create_account(services.store.as_ref(), profile).await?;
    signed_in(&services, user)
}

fn signed_in(services: &AppServices, user: User) -> ApiResult<Response> {
    let access_token = services.issue_token(user.id)?;
    tracing::info!(user_id = %user.id, "user signed in");

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Logged in successfully",
            "accessToken": access_token,
            "user": user,
        })),
    )
        .into_response())
}
