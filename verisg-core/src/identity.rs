//! Caller identity
//!
//! Sign-in and sessions live in an external auth service. The API only turns
//! a bearer token into a user id by asking that service who the token belongs
//! to. An unknown or expired token is an anonymous caller, never an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::AuthConfig;

pub type UserId = Uuid;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token; `None` for anonymous or unrecognised callers.
    async fn resolve(&self, bearer_token: &str) -> Option<UserId>;
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
}

/// Supabase-compatible `GET {url}/auth/v1/user` lookup.
#[derive(Debug, Clone)]
pub struct SupabaseIdentity {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseIdentity {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    /// `Ok(None)` when the auth service is not configured.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>, reqwest::Error> {
        match (config.resolved_url(), config.anon_key()) {
            (Some(url), Some(key)) => Ok(Some(Self::new(url, key, Duration::from_secs(5))?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn resolve(&self, bearer_token: &str) -> Option<UserId> {
        let token = bearer_token.trim();
        if token.is_empty() {
            return None;
        }

        let url = format!("{}/auth/v1/user", self.base_url);
        let response = match self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Auth lookup failed, treating caller as anonymous");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = response.status().as_u16(), "Auth service rejected token");
            return None;
        }

        response.json::<AuthUser>().await.ok().map(|u| u.id)
    }
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
