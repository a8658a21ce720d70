use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use teamflow_core::DomainError;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/current", get(current_user))
}

pub async fn current_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    let user = services
        .store
        .find_user(principal.user_id())
        .await?
        .ok_or_else(|| DomainError::not_found("User not found"))?;

    Ok(Json(json!({
        "message": "User fetched successfully",
        "user": user,
    }))
    .into_response())
}
