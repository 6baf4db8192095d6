//! Request gate and transport composition for the operations console.
//!
//! Provides:
//! - A reauthentication gate around every outbound API call, with
//!   single-flight session refresh and one-shot hard invalidation
//! - Session store / refresher / UI collaborator traits with default
//!   implementations
//! - A composition root tying the gate to the crypto services
//! - Environment-driven configuration and logging bootstrap

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod session;
pub mod transport;
pub mod ui;

pub use config::{AppConfig, ClientConfig};
pub use coordinator::{ApiRequest, GateState, ReauthCoordinator};
pub use error::{ClientError, ClientResult};
pub use logging::init_logging;
pub use session::{HttpSessionRefresher, MemorySessionStore, SessionRefresher, SessionStore};
pub use transport::{Collaborators, TransportLayer};
pub use ui::{Navigator, Notification, Notifier, ServerErrorEnvelope, Severity, UiChannel, UiEvent};
