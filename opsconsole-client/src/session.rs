//! Session store and refresh collaborators.
//!
//! The gate never owns session state. It reads the bearer token from a
//! [`SessionStore`], asks a [`SessionRefresher`] to recover an expired
//! session, and commands [`SessionStore::clear`] on hard invalidation.
//! Writing new token values is the refresher's job, not the gate's.

use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Token storage owned by the authentication layer.
pub trait SessionStore: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn store_tokens(&self, access_token: String, refresh_token: Option<String>);
    fn is_logged_in(&self) -> bool;
    /// Drops every persisted piece of the session.
    fn clear(&self);
}

/// Recovers a soft-expired session.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh(&self) -> ClientResult<()>;
}

#[derive(Default)]
struct Tokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// In-process session store.
#[derive(Default)]
pub struct MemorySessionStore {
    tokens: RwLock<Tokens>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts logged in.
    pub fn with_tokens(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        let store = Self::new();
        store.store_tokens(access_token.into(), refresh_token);
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    fn store_tokens(&self, access_token: String, refresh_token: Option<String>) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access_token = Some(access_token);
        if refresh_token.is_some() {
            tokens.refresh_token = refresh_token;
        }
    }

    fn is_logged_in(&self) -> bool {
        self.bearer_token().is_some()
    }

    fn clear(&self) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access_token = None;
        tokens.refresh_token = None;
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Exchanges the stored refresh token at the backend's refresh endpoint.
pub struct HttpSessionRefresher {
    client: Client,
    url: String,
    store: Arc<dyn SessionStore>,
}

impl HttpSessionRefresher {
    pub fn new(
        base_url: &str,
        refresh_path: &str,
        timeout: Duration,
        store: Arc<dyn SessionStore>,
    ) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), refresh_path),
            store,
        })
    }
}

#[async_trait]
impl SessionRefresher for HttpSessionRefresher {
    async fn refresh(&self) -> ClientResult<()> {
        let refresh_token = self.store.refresh_token().ok_or(ClientError::AuthRequired)?;

        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::FORBIDDEN
        {
            warn!("refresh token rejected with {}", resp.status());
            return Err(ClientError::RefreshFailed(
                "refresh token expired or revoked".to_string(),
            ));
        }

        let resp: TokenResponse = resp
            .error_for_status()
            .map_err(|e| ClientError::RefreshFailed(e.to_string()))?
            .json()
            .await?;

        self.store.store_tokens(resp.access_token, resp.refresh_token);
        debug!("session tokens refreshed");
        Ok(())
    }
}
