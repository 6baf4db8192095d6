//! UI side-channels: alert notifications and forced navigation.
//!
//! Both are fire-and-forget. A UI that has gone away (dropped receiver)
//! is not an error for the request path.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Shown when a failed response carries no recognizable error message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Shown when the request never got a response.
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to reach the server. Check your connection.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    Error,
}

/// Alert event delivered to the UI dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

/// Error body shapes the backend is known to send, in precedence order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ServerErrorEnvelope {
    Message { message: String },
    Error { error: String },
    Detail { detail: String },
}

impl ServerErrorEnvelope {
    pub fn into_message(self) -> String {
        match self {
            Self::Message { message } => message,
            Self::Error { error } => error,
            Self::Detail { detail } => detail,
        }
    }

    /// Extracts the user-facing message from a raw response body, falling
    /// back to [`GENERIC_ERROR_MESSAGE`] when no known shape matches.
    pub fn message_from_body(body: &str) -> String {
        serde_json::from_str::<Self>(body)
            .map(Self::into_message)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
    }
}

/// Receives user-facing alerts.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sends the user to the unauthenticated entry point.
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Alert(Notification),
    NavigateToLogin,
}

/// Channel-backed [`Notifier`] and [`Navigator`] for the UI event loop.
#[derive(Clone)]
pub struct UiChannel {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            debug!("UI receiver dropped, event discarded");
        }
    }
}

impl Notifier for UiChannel {
    fn notify(&self, notification: Notification) {
        self.send(UiEvent::Alert(notification));
    }
}

impl Navigator for UiChannel {
    fn to_login(&self) {
        self.send(UiEvent::NavigateToLogin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_wins_over_error_and_detail() {
        let body = r#"{"detail":"d","error":"e","message":"m"}"#;
        assert_eq!(ServerErrorEnvelope::message_from_body(body), "m");
    }

    #[test]
    fn error_wins_over_detail() {
        let body = r#"{"detail":"d","error":"e"}"#;
        assert_eq!(ServerErrorEnvelope::message_from_body(body), "e");
    }

    #[test]
    fn detail_is_last_resort() {
        assert_eq!(
            ServerErrorEnvelope::message_from_body(r#"{"detail":"d"}"#),
            "d"
        );
    }

    #[test]
    fn unknown_shapes_fall_back_to_generic() {
        for body in ["", "<html>502</html>", r#"{"code":17}"#, r#"{"message":42}"#, r#"{"message":"  "}"#] {
            assert_eq!(
                ServerErrorEnvelope::message_from_body(body),
                GENERIC_ERROR_MESSAGE,
                "{body:?}"
            );
        }
    }

    #[test]
    fn notification_serializes_with_lowercase_severity() {
        let json = serde_json::to_value(Notification::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "boom", "severity": "error" }));
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (ui, rx) = UiChannel::new();
        drop(rx);
        ui.notify(Notification::error("nobody listening"));
        ui.to_login();
    }

    #[tokio::test]
    async fn channel_delivers_events_in_order() {
        let (ui, mut rx) = UiChannel::new();
        ui.notify(Notification::error("first"));
        ui.to_login();
        assert_eq!(rx.recv().await, Some(UiEvent::Alert(Notification::error("first"))));
        assert_eq!(rx.recv().await, Some(UiEvent::NavigateToLogin));
    }
}
