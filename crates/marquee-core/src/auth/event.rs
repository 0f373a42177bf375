//! Session-change events and the channel-backed subscription handle.

use super::session::AuthSession;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Kinds of session-change notifications the account store emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A session-change notification.
///
/// `session` is `None` for sign-out. Transient duplicate events are legal
/// and consumers must tolerate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<AuthSession>,
}

impl AuthEvent {
    pub fn signed_in(session: AuthSession) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: AuthSession) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            session: Some(session),
        }
    }
}

/// A live subscription to session-change events.
///
/// Events arrive in emission order over an unbounded channel and are meant
/// to be drained by a single coordinating task. Dropping the subscription
/// unsubscribes; [`AuthSubscription::unsubscribe`] does so explicitly.
pub struct AuthSubscription {
    receiver: mpsc::UnboundedReceiver<AuthEvent>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl AuthSubscription {
    /// Creates a subscription whose cancellation runs `cancel` exactly once.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<AuthEvent>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates a subscription with no registration to tear down (tests,
    /// pre-wired channels).
    pub fn detached(receiver: mpsc::UnboundedReceiver<AuthEvent>) -> Self {
        Self {
            receiver,
            cancel: None,
        }
    }

    /// Receives the next event, or `None` once the emitter is gone.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.receiver.recv().await
    }

    /// Tears down the registration with the emitter.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
