use opsconsole_client::ClientError;
use opsconsole_crypto::CryptoError;

#[test]
fn api_error_display() {
    let err = ClientError::Api {
        status: 422,
        message: "Email already in use".into(),
    };
    assert_eq!(err.to_string(), "API request failed (422): Email already in use");
}

#[test]
fn auth_required_display() {
    assert_eq!(ClientError::AuthRequired.to_string(), "authentication required");
}

#[test]
fn session_expired_display() {
    assert_eq!(
        ClientError::SessionExpired.to_string(),
        "session expired and could not be refreshed"
    );
}

#[test]
fn session_invalidated_display() {
    assert_eq!(
        ClientError::SessionInvalidated.to_string(),
        "session invalidated, login required"
    );
}

#[test]
fn refresh_failed_display() {
    let err = ClientError::RefreshFailed("refresh token revoked".into());
    assert_eq!(err.to_string(), "session refresh failed: refresh token revoked");
}

#[test]
fn config_error_display() {
    let err = ClientError::Config("api_base_url is empty".into());
    assert_eq!(err.to_string(), "invalid configuration: api_base_url is empty");
}

#[test]
fn from_serde_json_error() {
    let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err: ClientError = json_err.into();
    assert!(matches!(err, ClientError::Serialization(_)));
    assert!(err.to_string().starts_with("serialization error:"));
}

#[test]
fn from_crypto_error() {
    let err: ClientError = CryptoError::MissingPassphrase.into();
    assert!(matches!(err, ClientError::Crypto(CryptoError::MissingPassphrase)));
    assert_eq!(err.to_string(), "crypto error: AEAD passphrase is not configured");
}

#[test]
fn login_required_only_for_session_errors() {
    assert!(ClientError::AuthRequired.requires_login());
    assert!(ClientError::SessionExpired.requires_login());
    assert!(ClientError::SessionInvalidated.requires_login());

    assert!(!ClientError::RefreshFailed("x".into()).requires_login());
    assert!(!ClientError::Config("x".into()).requires_login());
    assert!(
        !ClientError::Api {
            status: 500,
            message: "x".into()
        }
        .requires_login()
    );
}
