use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teamflow_core::{AccountId, DomainError, Entity, UserId};

/// Where an account's identity is asserted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    Google,
    Github,
    Facebook,
    /// Local email/password credentials; the provider id is the email.
    Email,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "GOOGLE",
            Provider::Github => "GITHUB",
            Provider::Facebook => "FACEBOOK",
            Provider::Email => "EMAIL",
        }
    }
}

impl core::fmt::Display for Provider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOOGLE" => Ok(Provider::Google),
            "GITHUB" => Ok(Provider::Github),
            "FACEBOOK" => Ok(Provider::Facebook),
            "EMAIL" => Ok(Provider::Email),
            other => Err(DomainError::validation(format!("unknown provider '{other}'"))),
        }
    }
}

/// Link between a user and an identity at a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub provider: Provider,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn link(
        user_id: UserId,
        provider: Provider,
        provider_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            provider,
            provider_id: provider_id.into(),
            created_at: now,
        }
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }
}
