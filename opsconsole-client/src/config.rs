//! Client and application configuration.

use crate::error::{ClientError, ClientResult};
use opsconsole_crypto::KeyMaterial;
use serde::{Deserialize, Serialize};

pub const ENV_API_BASE_URL: &str = "OPSCONSOLE_API_BASE_URL";

/// Configuration for the request gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for the console REST API (e.g., "https://ops.example.com").
    pub api_base_url: String,

    /// Status the backend uses for "session expired, refresh and retry".
    pub soft_expiry_status: u16,

    /// Status the backend uses for "session revoked, log in again".
    pub hard_expiry_status: u16,

    /// Path of the token refresh endpoint.
    pub refresh_path: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            soft_expiry_status: 401,
            hard_expiry_status: 419,
            refresh_path: "/api/auth/refresh".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Defaults, with the base URL taken from the environment when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = std::env::var(ENV_API_BASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        config
    }

    /// Rejects configurations the gate cannot run with.
    pub fn validate(&self) -> ClientResult<()> {
        if self.api_base_url.is_empty() {
            return Err(ClientError::Config("api_base_url is empty".to_string()));
        }
        if self.soft_expiry_status == self.hard_expiry_status {
            return Err(ClientError::Config(format!(
                "soft and hard expiry share status {}",
                self.soft_expiry_status
            )));
        }
        for status in [self.soft_expiry_status, self.hard_expiry_status] {
            if !(400..600).contains(&status) {
                return Err(ClientError::Config(format!(
                    "expiry status {status} is not an error status"
                )));
            }
        }
        Ok(())
    }
}

/// Everything read from the environment at process start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub keys: KeyMaterial,
    pub client: ClientConfig,
}

impl AppConfig {
    pub fn from_env() -> ClientResult<Self> {
        let keys = KeyMaterial::from_env()?;
        let client = ClientConfig::from_env();
        client.validate()?;
        Ok(Self { keys, client })
    }
}
