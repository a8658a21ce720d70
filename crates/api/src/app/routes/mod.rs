use axum::Router;

pub mod auth;
pub mod projects;
pub mod system;
pub mod tasks;
pub mod user;
pub mod workspaces;

/// Router for unauthenticated endpoints (sign-up, sign-in, OAuth callback).
pub fn public() -> Router {
    Router::new().nest("/auth", auth::router())
}

/// Router for all authenticated endpoints.
pub fn protected() -> Router {
    Router::new()
        .nest("/user", user::router())
        .nest("/workspace", workspaces::router())
        .nest("/project", projects::router())
        .nest("/task", tasks::router())
}
