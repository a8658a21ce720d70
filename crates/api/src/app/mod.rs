//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, token signer, identity provider, task codes
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs, validation, query parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router from configuration (used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = AppServices::from_config(config).await?;
    Ok(router(Arc::new(services), &config.base_path))
}

/// Router over already-wired services. `/health` stays at the root; every
/// other route lives under `base_path`.
pub fn router(services: Arc<AppServices>, base_path: &str) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt_validator(),
    };

    // Protected routes: require a valid bearer token.
    let protected = routes::protected().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let api = routes::public()
        .merge(protected)
        .layer(Extension(services));

    let app = Router::new().route("/health", get(routes::system::health));
    let app = if base_path.is_empty() {
        app.merge(api)
    } else {
        app.nest(base_path, api)
    };

    app.layer(ServiceBuilder::new())
}
