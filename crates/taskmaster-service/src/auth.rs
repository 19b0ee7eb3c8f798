//! Credential verification seam.
//!
//! Handlers never parse tokens. A [`CredentialVerifier`] turns a bearer
//! token into [`Claims`], and the handler takes the user id from them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a token was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,
}

/// Claims carried by a verified token.
///
/// Clients have issued the user id under both `id` and `_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "_id", default)]
    pub legacy_id: Option<String>,

    /// Expiry as Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            id: Some(user_id.into()),
            legacy_id: None,
            exp: None,
        }
    }

    pub fn with_expiry(mut self, at: DateTime<Utc>) -> Self {
        self.exp = Some(at.timestamp());
        self
    }

    /// True once `now` has reached the expiry. Claims without one never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| now.timestamp() >= exp)
    }

    /// The user id: `id` first, then `_id`. Empty values count as absent.
    pub fn user_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.legacy_id.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Verifies bearer tokens.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Verifier backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Claims>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a token -> user id table.
    pub fn from_user_ids(tokens: &HashMap<String, String>) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|(token, user)| (token.clone(), Claims::for_user(user.clone())))
                .collect(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, claims: Claims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.get(token).ok_or(AuthError::Invalid)?;
        if claims.is_expired(Utc::now()) {
            return Err(AuthError::Expired);
        }
        Ok(claims.clone())
    }
}
