//! Session provider - resolves bearer tokens to authenticated users.
//!
//! Authentication itself is handled by an external identity service; this crate
//! only needs to know who is calling and with which role. [`InMemorySessions`]
//! serves development and tests; a production deployment plugs in its own
//! [`SessionProvider`].

use crate::{
    config::settings::SessionSeed,
    errors::{Error, Result},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::RwLock;

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Books venues
    Client,
    /// Owns and configures venues
    Host,
    /// Manages global packages and can act on any record
    Admin,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "client" => Ok(Self::Client),
            "host" => Ok(Self::Host),
            "admin" => Ok(Self::Admin),
            other => Err(Error::Config {
                message: format!("unknown role '{other}'"),
            }),
        }
    }
}

/// The caller behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    /// Stable user identifier
    pub user_id: String,
    /// Role granted to the user
    pub role: Role,
}

impl AuthUser {
    /// Builds a user.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// True for admins.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins, or the user whose ID matches `owner_id`.
    #[must_use]
    pub fn owns_or_admin(&self, owner_id: &str) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Requires an authenticated user.
pub fn require_user(user: Option<&AuthUser>) -> Result<&AuthUser> {
    user.ok_or(Error::Unauthenticated)
}

/// Resolves bearer tokens to users.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the user for a token, or None when the token is unknown or expired.
    async fn resolve(&self, token: &str) -> Result<Option<AuthUser>>;
}

/// Token table held in memory.
#[derive(Debug, Default)]
pub struct InMemorySessions {
    sessions: RwLock<HashMap<String, AuthUser>>,
}

impl InMemorySessions {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider from configured session seeds.
    pub fn from_seeds(seeds: &[SessionSeed]) -> Result<Self> {
        let mut sessions = HashMap::with_capacity(seeds.len());
        for seed in seeds {
            sessions.insert(
                seed.token.clone(),
                AuthUser::new(seed.user_id.clone(), seed.role.parse()?),
            );
        }
        Ok(Self {
            sessions: RwLock::new(sessions),
        })
    }

    /// Registers a token.
    pub async fn insert(&self, token: impl Into<String>, user: AuthUser) {
        self.sessions.write().await.insert(token.into(), user);
    }
}

#[async_trait]
impl SessionProvider for InMemorySessions {
    async fn resolve(&self, token: &str) -> Result<Option<AuthUser>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}
