//! Reauthentication gate wrapped around every outbound API call.
//!
//! Attaches the bearer token, recognizes the backend's two session expiry
//! statuses, and makes sure at most one refresh runs at a time:
//!
//! - **Soft expiry**: the first request to see it takes the refresh lock
//!   and runs the [`SessionRefresher`]. Requests that hit the same expiry
//!   meanwhile wait for the lock, notice the refresh generation moved, and
//!   retry with the new token instead of refreshing again. New requests
//!   wait for the lock before they are sent at all.
//! - **Hard expiry**: the session is cleared and the user is sent to login,
//!   once, no matter how many in-flight responses carry the status.
//!   Authenticated requests then fail fast until [`ReauthCoordinator::resume`].
//!
//! Any other failure is reported once to the [`Notifier`] and returned to
//! the caller. Nothing is retried except the single post-refresh replay.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::{SessionRefresher, SessionStore};
use crate::ui::{Navigator, Notification, Notifier, ServerErrorEnvelope, NETWORK_ERROR_MESSAGE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, debug_span, info, warn, Instrument};
use uuid::Uuid;

/// Gate-level view of the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Idle,
    /// A refresh is running and other requests are queued behind it.
    AwaitingLockRelease,
    /// A refresh is running with nobody waiting on it.
    HoldingLock,
    /// Session revoked; a new login is required.
    HardInvalidated,
}

/// A replayable API request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> ClientResult<Self> {
        Self::new(Method::POST, path).with_json(body)
    }

    pub fn put<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> ClientResult<Self> {
        Self::new(Method::PUT, path).with_json(body)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Sends without a bearer token (login, public endpoints). Soft expiry
    /// statuses on such requests are ordinary failures.
    pub fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Counts a waiter for as long as it lives.
struct CountGuard<'a>(&'a AtomicUsize);

impl<'a> CountGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for CountGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Raises a flag for as long as it lives.
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Serializes session refreshes across all in-flight requests.
pub struct ReauthCoordinator {
    client: Client,
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    refresher: Arc<dyn SessionRefresher>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    /// Held for the duration of one refresh sequence.
    refresh_lock: Mutex<()>,
    /// Bumped after every successful refresh. A request that observed an
    /// older generation when its token was attached knows someone else
    /// already refreshed.
    refresh_generation: AtomicU64,
    refreshing: AtomicBool,
    waiting: AtomicUsize,
    invalidated: AtomicBool,
}

impl ReauthCoordinator {
    pub fn new(
        config: ClientConfig,
        session: Arc<dyn SessionStore>,
        refresher: Arc<dyn SessionRefresher>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            session,
            refresher,
            notifier,
            navigator,
            refresh_lock: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
            invalidated: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> GateState {
        if self.invalidated.load(Ordering::SeqCst) {
            GateState::HardInvalidated
        } else if self.refreshing.load(Ordering::SeqCst) {
            if self.waiting.load(Ordering::SeqCst) > 0 {
                GateState::AwaitingLockRelease
            } else {
                GateState::HoldingLock
            }
        } else {
            GateState::Idle
        }
    }

    /// Number of successful refreshes so far.
    pub fn refresh_generation(&self) -> u64 {
        self.refresh_generation.load(Ordering::SeqCst)
    }

    /// Leaves `HardInvalidated` after the user has logged in again.
    pub fn resume(&self) {
        if self.invalidated.swap(false, Ordering::SeqCst) {
            info!("request gate resumed after login");
        }
    }

    // ── Typed helpers ──

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        Ok(self.execute(&ApiRequest::get(path)).await?.json().await?)
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let request = ApiRequest::post(path, body)?;
        Ok(self.execute(&request).await?.json().await?)
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let request = ApiRequest::put(path, body)?;
        Ok(self.execute(&request).await?.json().await?)
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.execute(&ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Sends `request` through the gate and returns the successful response.
    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<Response> {
        let span = debug_span!(
            "gated_request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &ApiRequest) -> ClientResult<Response> {
        if request.authenticated && self.invalidated.load(Ordering::SeqCst) {
            return Err(ClientError::SessionInvalidated);
        }

        let (resp, generation) = self.dispatch(request).await?;
        let status = resp.status().as_u16();

        if status == self.config.hard_expiry_status {
            self.invalidate("hard expiry status");
            return Err(ClientError::SessionInvalidated);
        }

        if status != self.config.soft_expiry_status || !request.authenticated {
            return self.finish(resp).await;
        }

        debug!("soft expiry status {status}");
        self.recover(generation).await?;

        let (resp, _) = self.dispatch(request).await?;
        let status = resp.status().as_u16();

        if status == self.config.hard_expiry_status {
            self.invalidate("hard expiry status after refresh");
            return Err(ClientError::SessionInvalidated);
        }
        if status == self.config.soft_expiry_status {
            warn!("request still rejected after refresh");
            self.invalidate("refreshed session rejected");
            return Err(ClientError::SessionExpired);
        }

        self.finish(resp).await
    }

    /// Sends once, returning the response and the refresh generation that
    /// was current when the token was attached.
    async fn dispatch(&self, request: &ApiRequest) -> ClientResult<(Response, u64)> {
        self.wait_for_refresh().await;
        if request.authenticated && self.invalidated.load(Ordering::SeqCst) {
            return Err(ClientError::SessionInvalidated);
        }

        // Read the generation before the token: the refresher stores the
        // token before the generation is bumped.
        let generation = self.refresh_generation.load(Ordering::SeqCst);

        let url = format!(
            "{}{}",
            self.config.api_base_url.trim_end_matches('/'),
            request.path
        );
        let mut builder = self.client.request(request.method.clone(), url);

        if request.authenticated {
            let token = self.session.bearer_token().ok_or(ClientError::AuthRequired)?;
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        match builder.send().await {
            Ok(resp) => Ok((resp, generation)),
            Err(e) => {
                warn!("request failed without a response: {e}");
                self.notifier.notify(Notification::error(NETWORK_ERROR_MESSAGE));
                Err(ClientError::Http(e))
            }
        }
    }

    async fn wait_for_refresh(&self) {
        if self.refresh_lock.try_lock().is_ok() {
            return;
        }

        debug!("refresh in flight, waiting for release");
        let _waiting = CountGuard::new(&self.waiting);
        drop(self.refresh_lock.lock().await);
    }

    async fn recover(&self, observed_generation: u64) -> ClientResult<()> {
        let _guard = {
            let _waiting = CountGuard::new(&self.waiting);
            self.refresh_lock.lock().await
        };

        if self.invalidated.load(Ordering::SeqCst) {
            return Err(ClientError::SessionInvalidated);
        }
        if self.refresh_generation.load(Ordering::SeqCst) != observed_generation {
            debug!("session already refreshed by a concurrent request");
            return Ok(());
        }

        info!("session expired, refreshing");
        let result = {
            let _refreshing = FlagGuard::new(&self.refreshing);
            self.refresher.refresh().await
        };

        match result {
            Ok(()) => {
                // A hard expiry may have landed while the refresher ran.
                if self.invalidated.load(Ordering::SeqCst) {
                    warn!("session invalidated during refresh, discarding new tokens");
                    self.session.clear();
                    return Err(ClientError::SessionInvalidated);
                }
                self.refresh_generation.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                warn!("session refresh failed: {e}");
                self.invalidate("refresh failed");
                Err(ClientError::SessionExpired)
            }
        }
    }

    fn invalidate(&self, reason: &str) {
        if self.invalidated.swap(true, Ordering::SeqCst) {
            debug!("session already invalidated ({reason})");
            return;
        }

        info!("session invalidated ({reason}), redirecting to login");
        self.session.clear();
        self.navigator.to_login();
    }

    async fn finish(&self, resp: Response) -> ClientResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = ServerErrorEnvelope::message_from_body(&body);
        debug!("request failed with {status}: {message}");

        self.notifier.notify(Notification::error(message.clone()));
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
