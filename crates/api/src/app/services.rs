use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use thiserror::Error;

use teamflow_auth::{Hs256JwtValidator, JwtClaims, JwtValidator};
use teamflow_core::UserId;
use teamflow_infra::services::bootstrap::OAuthProfile;
use teamflow_infra::{InMemoryStore, PostgresStore, Store};
use teamflow_projects::{TaskCodeGenerator, UuidTaskCodes};

use crate::app::errors::{ApiError, ApiResult};
use crate::config::{AppConfig, StoreConfig};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("authorization code rejected: {0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// External identity provider (Google sign-in).
///
/// Exchanges the authorization code from the redirect for a verified profile.
/// Protocol mechanics live behind this trait; tests plug in a stub.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<OAuthProfile, IdentityError>;
}

/// Everything request handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub task_codes: Arc<dyn TaskCodeGenerator>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    tokens: Arc<Hs256JwtValidator>,
    token_ttl: Duration,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, jwt_secret: &str, token_ttl: Duration) -> Self {
        Self {
            store,
            task_codes: Arc::new(UuidTaskCodes),
            identity: None,
            tokens: Arc::new(Hs256JwtValidator::new(jwt_secret.as_bytes().to_vec())),
            token_ttl,
        }
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match &config.store {
            StoreConfig::InMemory => {
                tracing::info!("using in-memory store");
                Arc::new(InMemoryStore::with_default_roles())
            }
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let store = PostgresStore::connect(database_url, *max_connections).await?;
                store.migrate().await?;
                tracing::info!(max_connections, "using postgres store");
                Arc::new(store)
            }
        };

        let token_ttl = Duration::try_minutes(config.jwt_ttl_minutes)
            .context("JWT_TTL_MINUTES is out of range")?;
        Ok(Self::new(store, &config.jwt_secret, token_ttl))
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    pub fn with_task_codes(mut self, codes: Arc<dyn TaskCodeGenerator>) -> Self {
        self.task_codes = codes;
        self
    }

    pub fn jwt_validator(&self) -> Arc<dyn JwtValidator> {
        self.tokens.clone()
    }

    pub fn issue_token(&self, user_id: UserId) -> ApiResult<String> {
        let claims = JwtClaims::for_user(user_id, Utc::now(), self.token_ttl);
        self.tokens
            .issue(&claims)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }
}
