//! Client error types.

use thiserror::Error;

/// Result type for gated requests.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by the request gate and its collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication required")]
    AuthRequired,

    #[error("session expired and could not be refreshed")]
    SessionExpired,

    #[error("session invalidated, login required")]
    SessionInvalidated,

    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] opsconsole_crypto::CryptoError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the caller must send the user back through login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired | Self::SessionExpired | Self::SessionInvalidated
        )
    }
}
