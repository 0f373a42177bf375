//! Shared view of the current authenticated session.

use marquee_core::auth::AuthSession;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A cloneable handle to the current session.
///
/// The auth client is the single writer; the record store reads the access
/// token from here so row-level policies see the caller's identity.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current session.
    pub async fn set(&self, session: AuthSession) {
        *self.inner.write().await = Some(session);
    }

    /// Clears the current session.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    /// Returns a copy of the current session, if any.
    pub async fn current(&self) -> Option<AuthSession> {
        self.inner.read().await.clone()
    }

    /// Returns the current access token, if signed in.
    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
    }
}
