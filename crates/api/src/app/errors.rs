//! The one place where errors become HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use teamflow_auth::AuthzError;
use teamflow_core::DomainError;
use teamflow_infra::{ServiceError, StoreError};

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Request body or parameters failed validation.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid JSON payload")]
    InvalidJson(String),

    #[error("{message}")]
    Status {
        status: StatusCode,
        code: &'static str,
        message: String,
    },

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self::Service(ServiceError::Domain(e))
    }
}

impl From<AuthzError> for ApiError {
    fn from(e: AuthzError) -> Self {
        Self::Service(ServiceError::Authz(e))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Service(ServiceError::Store(e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON whose shape does not match the DTO.
            JsonRejection::JsonDataError(e) => Self::field("body", e.body_text()),
            other => Self::InvalidJson(other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(e) => service_error_to_response(e),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "message": "Validation failed",
                    "errorCode": "VALIDATION_ERROR",
                    "errors": errors,
                })),
            )
                .into_response(),
            ApiError::InvalidJson(detail) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "message": "Invalid JSON payload",
                    "error": detail,
                })),
            )
                .into_response(),
            ApiError::Status {
                status,
                code,
                message,
            } => json_error(status, code, message),
            ApiError::Internal(detail) => internal_error(detail),
        }
    }
}

fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Authz(e) => json_error(StatusCode::UNAUTHORIZED, "ACCESS_UNAUTHORIZED", e.to_string()),
        ServiceError::Store(StoreError::Duplicate { entity, .. }) => json_error(
            StatusCode::CONFLICT,
            "RESOURCE_CONFLICT",
            format!("{entity} already exists"),
        ),
        ServiceError::Store(e) => internal_error(e.to_string()),
        ServiceError::Password(e) => internal_error(e.to_string()),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
        }
        DomainError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND", msg),
        DomainError::Unauthorized(msg) => {
            json_error(StatusCode::UNAUTHORIZED, "ACCESS_UNAUTHORIZED", msg)
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "RESOURCE_CONFLICT", msg),
    }
}

fn internal_error(detail: String) -> Response {
    tracing::error!(error = %detail, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({
            "message": "Internal Server Error",
            "error": detail,
        })),
    )
        .into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "message": message.into(),
            "errorCode": code,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x"), StatusCode::BAD_REQUEST),
            (DomainError::bad_request("x"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("x"), StatusCode::NOT_FOUND),
            (DomainError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn authz_is_unauthorized_and_backend_is_internal() {
        let denied = ApiError::from(AuthzError::Forbidden { missing: vec![] });
        assert_eq!(denied.into_response().status(), StatusCode::UNAUTHORIZED);

        let backend = ApiError::from(ServiceError::Store(StoreError::backend("insert_user", "boom")));
        assert_eq!(
            backend.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let duplicate = ApiError::from(ServiceError::Store(StoreError::Duplicate {
            entity: "member",
            detail: "x".into(),
        }));
        assert_eq!(duplicate.into_response().status(), StatusCode::CONFLICT);
    }
}
