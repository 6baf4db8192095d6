use opsconsole_client::{
    AppConfig, ClientConfig, Collaborators, MemorySessionStore, Notification, SessionStore,
    TransportLayer, UiChannel, UiEvent,
};
use opsconsole_crypto::KeyMaterial;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSPHRASE: &str = "correct-horse-battery-staple-key";

/// Produced by the backend for "Hello World" under `PASSPHRASE`.
const BACKEND_VECTOR: &str = "AAECAwQFBgcICQoLDA0ODw==:u33Wm+F+ncTgy7I2x6XJsQ==:BdqLMexGzcuBYWk=";

fn key_material() -> KeyMaterial {
    let key: [u8; 32] = std::array::from_fn(|i| i as u8);
    let iv: [u8; 16] = std::array::from_fn(|i| 0xa0 + i as u8);
    KeyMaterial::new(PASSPHRASE, key, iv).unwrap()
}

fn app_config(server: &MockServer) -> AppConfig {
    AppConfig {
        keys: key_material(),
        client: ClientConfig {
            api_base_url: server.uri(),
            ..ClientConfig::default()
        },
    }
}

fn layer(server: &MockServer) -> (TransportLayer, tokio::sync::mpsc::UnboundedReceiver<UiEvent>) {
    let config = app_config(server);
    let session: Arc<dyn SessionStore> =
        Arc::new(MemorySessionStore::with_tokens("at-1", Some("rt-1".into())));
    let (ui, events) = UiChannel::new();
    let collaborators = Collaborators::http(&config, session, ui).unwrap();
    (TransportLayer::new(config, collaborators).unwrap(), events)
}

#[tokio::test]
async fn new_layer_defers_key_derivation() {
    let server = MockServer::start().await;
    let (transport, _events) = layer(&server);
    assert!(!transport.aead().is_initialized());
}

#[tokio::test]
async fn warmup_derives_the_key() {
    let server = MockServer::start().await;
    let (transport, _events) = layer(&server);

    transport.spawn_key_warmup().await.unwrap().unwrap();
    assert!(transport.aead().is_initialized());
}

#[tokio::test]
async fn aead_decrypts_backend_payload() {
    let server = MockServer::start().await;
    let (transport, _events) = layer(&server);

    let plaintext = transport.aead().decrypt(BACKEND_VECTOR).await.unwrap();
    assert_eq!(plaintext.as_deref(), Some("Hello World"));
}

#[tokio::test]
async fn dispose_drops_key_and_service_still_works() {
    let server = MockServer::start().await;
    let (transport, _events) = layer(&server);

    let wire = transport.aead().encrypt("ops@example.com").await.unwrap().unwrap();
    transport.dispose();
    assert!(!transport.aead().is_initialized());

    let plaintext = transport.aead().decrypt(&wire).await.unwrap();
    assert_eq!(plaintext.as_deref(), Some("ops@example.com"));
}

#[tokio::test]
async fn ids_use_configured_block_cipher_key() {
    let server = MockServer::start().await;
    let (transport, _events) = layer(&server);

    assert_eq!(transport.ids().obfuscate("12345"), "fa6901f2ba8c8eadcf0be2ca3bff68e3");
    assert_eq!(transport.ids().deobfuscate("fa6901f2ba8c8eadcf0be2ca3bff68e3"), "12345");
}

#[tokio::test]
async fn gate_failures_reach_the_ui_channel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hosts/fa6901f2ba8c8eadcf0be2ca3bff68e3"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({ "message": "Host not found" })),
        )
        .mount(&server)
        .await;

    let (transport, mut events) = layer(&server);
    let id = transport.ids().obfuscate("12345");
    let result = transport
        .gate()
        .get_json::<serde_json::Value>(&format!("/api/hosts/{id}"))
        .await;

    assert!(result.is_err());
    assert_eq!(
        events.recv().await,
        Some(UiEvent::Alert(Notification::error("Host not found")))
    );
}

#[tokio::test]
async fn invalid_client_config_is_rejected() {
    let server = MockServer::start().await;
    let mut config = app_config(&server);
    config.client.hard_expiry_status = config.client.soft_expiry_status;

    let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let (ui, _events) = UiChannel::new();
    let collaborators = Collaborators::http(&config, session, ui).unwrap();
    assert!(TransportLayer::new(config, collaborators).is_err());
}
