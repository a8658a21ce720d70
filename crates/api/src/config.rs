//! Process configuration, read once from the environment at startup.

use anyhow::{Context, bail};
use chrono::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_BASE_PATH: &str = "/api";
const DEFAULT_JWT_TTL_MINUTES: i64 = 60 * 24;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Prefix for every route except `/health`. Always starts with `/`, never ends with one.
    pub base_path: String,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().with_context(|| format!("invalid PORT: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let base_path = normalize_base_path(lookup("BASE_PATH").as_deref().unwrap_or(DEFAULT_BASE_PATH));

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt_ttl_minutes = match lookup("JWT_TTL_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid JWT_TTL_MINUTES: {raw}"))?,
            None => DEFAULT_JWT_TTL_MINUTES,
        };
        if jwt_ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive");
        }
        if Duration::try_minutes(jwt_ttl_minutes).is_none() {
            bail!("JWT_TTL_MINUTES is out of range: {jwt_ttl_minutes}");
        }

        let persistent = lookup("USE_PERSISTENT_STORES")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let store = if persistent {
            let database_url = lookup("DATABASE_URL")
                .context("DATABASE_URL is required when USE_PERSISTENT_STORES is enabled")?;
            let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid DATABASE_MAX_CONNECTIONS: {raw}"))?,
                None => DEFAULT_MAX_CONNECTIONS,
            };
            StoreConfig::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreConfig::InMemory
        };

        Ok(Self {
            port,
            base_path,
            jwt_secret,
            jwt_ttl_minutes,
            store,
        })
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
