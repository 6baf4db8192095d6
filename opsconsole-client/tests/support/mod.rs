//! Shared test doubles for the request gate.

use async_trait::async_trait;
use opsconsole_client::{
    ClientConfig, ClientError, ClientResult, MemorySessionStore, Navigator, Notification,
    Notifier, ReauthCoordinator, SessionRefresher, SessionStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

pub const OLD_TOKEN: &str = "at-old";
pub const NEW_TOKEN: &str = "at-new";

/// Memory store that counts `clear` calls.
#[derive(Default)]
pub struct CountingStore {
    inner: MemorySessionStore,
    pub clears: AtomicUsize,
}

impl CountingStore {
    pub fn logged_in() -> Self {
        let store = Self::default();
        store.store_tokens(OLD_TOKEN.to_string(), Some("rt".to_string()));
        store
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl SessionStore for CountingStore {
    fn bearer_token(&self) -> Option<String> {
        self.inner.bearer_token()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.refresh_token()
    }

    fn store_tokens(&self, access_token: String, refresh_token: Option<String>) {
        self.inner.store_tokens(access_token, refresh_token);
    }

    fn is_logged_in(&self) -> bool {
        self.inner.is_logged_in()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear();
    }
}

/// Records alerts and login redirects.
#[derive(Default)]
pub struct RecordingUi {
    pub alerts: Mutex<Vec<Notification>>,
    pub navigations: AtomicUsize,
}

impl RecordingUi {
    pub fn alerts(&self) -> Vec<Notification> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingUi {
    fn notify(&self, notification: Notification) {
        self.alerts.lock().unwrap().push(notification);
    }
}

impl Navigator for RecordingUi {
    fn to_login(&self) {
        self.navigations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Refresher that swaps in `NEW_TOKEN` after a delay, or fails.
pub struct ScriptedRefresher {
    store: Arc<CountingStore>,
    delay: Duration,
    fail: bool,
    pub calls: AtomicUsize,
}

impl ScriptedRefresher {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionRefresher for ScriptedRefresher {
    async fn refresh(&self) -> ClientResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(ClientError::RefreshFailed("refresh token revoked".to_string()));
        }
        self.store.store_tokens(NEW_TOKEN.to_string(), None);
        Ok(())
    }
}

pub struct Harness {
    pub gate: Arc<ReauthCoordinator>,
    pub store: Arc<CountingStore>,
    pub refresher: Arc<ScriptedRefresher>,
    pub ui: Arc<RecordingUi>,
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_base_url: server.uri(),
        ..ClientConfig::default()
    }
}

pub fn harness(server: &MockServer) -> Harness {
    build(config_for(server), Duration::from_millis(100), false)
}

pub fn failing_harness(server: &MockServer) -> Harness {
    build(config_for(server), Duration::from_millis(50), true)
}

pub fn slow_harness(server: &MockServer, delay: Duration) -> Harness {
    build(config_for(server), delay, false)
}

pub fn build(config: ClientConfig, delay: Duration, fail: bool) -> Harness {
    let store = Arc::new(CountingStore::logged_in());
    let refresher = Arc::new(ScriptedRefresher {
        store: Arc::clone(&store),
        delay,
        fail,
        calls: AtomicUsize::new(0),
    });
    let ui = Arc::new(RecordingUi::default());

    let gate = ReauthCoordinator::new(
        config,
        store.clone(),
        refresher.clone(),
        ui.clone(),
        ui.clone(),
    )
    .expect("gate must build");

    Harness {
        gate: Arc::new(gate),
        store,
        refresher,
        ui,
    }
}
