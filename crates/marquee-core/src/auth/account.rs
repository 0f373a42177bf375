//! Remote account store trait.
//!
//! Defines the interface to the external service that owns authentication
//! and session lifecycle.

use super::event::AuthSubscription;
use super::session::{AuthSession, SessionMetadata};
use crate::error::{AuthError, Result};
use async_trait::async_trait;

/// An abstract handle to the remote account store.
///
/// This trait decouples the reconciler from the concrete backend client so
/// the state machine can be exercised against scripted implementations.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Retrieves the persisted session, refreshing it when necessary.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(AuthSession))`: a usable session exists
    /// - `Ok(None)`: signed out
    /// - `Err(_)`: the persisted state could not be read
    async fn current_session(&self) -> Result<Option<AuthSession>>;

    /// Authenticates with email and password.
    ///
    /// Credential failures come back as an [`AuthError`] value carrying the
    /// service's message verbatim; they are the only error class shown to
    /// the user.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<AuthSession, AuthError>;

    /// Requests account creation with the given metadata embedded.
    ///
    /// Does not return a usable session: confirmation is asynchronous and
    /// the caller is expected to redirect to sign-in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SessionMetadata,
    ) -> std::result::Result<(), AuthError>;

    /// Invalidates the session remotely, best-effort.
    async fn sign_out(&self) -> Result<()>;

    /// Registers a standing subscription to session-change events.
    fn subscribe(&self) -> AuthSubscription;
}
