//! Composition root for the transport layer.
//!
//! Owns the AEAD service, the ID obfuscator and the request gate so that
//! nothing lives in ambient global state. The application builds one
//! [`TransportLayer`] at startup and calls [`TransportLayer::dispose`] on
//! shutdown or logout.

use crate::config::AppConfig;
use crate::coordinator::ReauthCoordinator;
use crate::error::ClientResult;
use crate::session::{HttpSessionRefresher, SessionRefresher, SessionStore};
use crate::ui::{Navigator, Notifier, UiChannel};
use opsconsole_crypto::{AeadCipherService, CryptoResult, IdObfuscator};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// External collaborators the gate talks to.
pub struct Collaborators {
    pub session: Arc<dyn SessionStore>,
    pub refresher: Arc<dyn SessionRefresher>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

impl Collaborators {
    /// Wires an HTTP refresher against `session` and routes UI events
    /// through `ui`.
    pub fn http(config: &AppConfig, session: Arc<dyn SessionStore>, ui: UiChannel) -> ClientResult<Self> {
        let refresher = HttpSessionRefresher::new(
            &config.client.api_base_url,
            &config.client.refresh_path,
            Duration::from_secs(config.client.request_timeout_secs),
            Arc::clone(&session),
        )?;
        let ui = Arc::new(ui);

        Ok(Self {
            session,
            refresher: Arc::new(refresher),
            notifier: ui.clone(),
            navigator: ui,
        })
    }
}

pub struct TransportLayer {
    aead: Arc<AeadCipherService>,
    ids: IdObfuscator,
    gate: Arc<ReauthCoordinator>,
}

impl TransportLayer {
    /// Builds the layer. Does not derive the AEAD key.
    pub fn new(config: AppConfig, collaborators: Collaborators) -> ClientResult<Self> {
        let AppConfig { keys, client } = config;

        let gate = ReauthCoordinator::new(
            client,
            collaborators.session,
            collaborators.refresher,
            collaborators.notifier,
            collaborators.navigator,
        )?;

        info!("transport layer ready");
        Ok(Self {
            aead: Arc::new(AeadCipherService::new(keys.aead_passphrase())),
            ids: IdObfuscator::from_key_material(&keys),
            gate: Arc::new(gate),
        })
    }

    /// Starts key derivation in the background so the first encrypt does
    /// not pay for it. Optional; encrypt/decrypt derive on demand anyway.
    pub fn spawn_key_warmup(&self) -> JoinHandle<CryptoResult<()>> {
        let aead = Arc::clone(&self.aead);
        tokio::spawn(async move { aead.initialize().await })
    }

    pub fn aead(&self) -> &Arc<AeadCipherService> {
        &self.aead
    }

    pub fn ids(&self) -> &IdObfuscator {
        &self.ids
    }

    pub fn gate(&self) -> &Arc<ReauthCoordinator> {
        &self.gate
    }

    /// Drops the derived key.
    pub fn dispose(&self) {
        self.aead.dispose();
        info!("transport layer disposed");
    }
}
