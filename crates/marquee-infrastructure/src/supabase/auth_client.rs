//! Supabase auth REST client.
//!
//! Implements the remote account store over the password, signup, logout and
//! refresh endpoints, persists the session to disk, and fans session-change
//! events out to subscribers.

use super::config::SupabaseConfig;
use super::session_handle::SessionHandle;
use crate::storage::session_storage::SessionStorage;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marquee_core::auth::{
    AccountStore, AuthEvent, AuthSession, AuthSubscription, SessionMetadata, UserRole,
};
use marquee_core::error::{AuthError, MarqueeError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Leeway applied to the access token expiry when deciding whether a
/// persisted session still needs a refresh before use.
const EXPIRY_LEEWAY_SECONDS: i64 = 30;

/// Client for the remote account store.
///
/// The client is the single writer of the shared [`SessionHandle`]; every
/// sign-in, refresh, and sign-out updates both the handle and the persisted
/// session file, then notifies subscribers.
pub struct SupabaseAuthClient {
    client: Client,
    config: SupabaseConfig,
    session: SessionHandle,
    storage: SessionStorage,
    subscribers: Arc<Mutex<SubscriberRegistry>>,
}

#[derive(Default)]
struct SubscriberRegistry {
    next_id: u64,
    senders: Vec<(u64, mpsc::UnboundedSender<AuthEvent>)>,
}

impl SupabaseAuthClient {
    /// Creates a client persisting the session at the default location.
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let storage =
            SessionStorage::new().map_err(|err| MarqueeError::config(err.to_string()))?;
        Ok(Self::with_storage(config, storage))
    }

    /// Creates a client with custom session storage (for testing).
    pub fn with_storage(config: SupabaseConfig, storage: SessionStorage) -> Self {
        Self {
            client: Client::new(),
            config,
            session: SessionHandle::new(),
            storage,
            subscribers: Arc::new(Mutex::new(SubscriberRegistry::default())),
        }
    }

    /// Returns the shared session handle for wiring into the record store.
    pub fn session_handle(&self) -> SessionHandle {
        self.session.clone()
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url, path)
    }

    fn emit(&self, event: AuthEvent) {
        let mut registry = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry
            .senders
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    async fn token_request(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.config.anon_key)
            .json(body)
            .send()
            .await
            .map_err(|err| AuthError::new(format!("auth request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(auth_error_from_response(status.as_u16(), &body_text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::new(format!("failed to decode auth response: {err}")))?;
        Ok(token.into_session())
    }

    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> std::result::Result<AuthSession, AuthError> {
        let session = self
            .token_request(
                "refresh_token",
                &serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;
        self.persist(&session).await;
        self.emit(AuthEvent::token_refreshed(session.clone()));
        Ok(session)
    }

    async fn persist(&self, session: &AuthSession) {
        if let Err(err) = self.storage.save(session) {
            tracing::warn!("[SupabaseAuth] failed to persist session: {}", err);
        }
        self.session.set(session.clone()).await;
    }

    async fn discard_local(&self) {
        if let Err(err) = self.storage.clear() {
            tracing::warn!("[SupabaseAuth] failed to clear persisted session: {}", err);
        }
        self.session.clear().await;
    }
}

#[async_trait]
impl AccountStore for SupabaseAuthClient {
    async fn current_session(&self) -> Result<Option<AuthSession>> {
        let Some(stored) = self
            .storage
            .load()
            .map_err(|err| MarqueeError::io(err.to_string()))?
        else {
            return Ok(None);
        };

        if stored.is_expired(Duration::seconds(EXPIRY_LEEWAY_SECONDS)) {
            let Some(refresh_token) = stored.refresh_token.clone() else {
                tracing::info!("[SupabaseAuth] persisted session expired with no refresh token");
                self.discard_local().await;
                return Ok(None);
            };
            return match self.refresh(&refresh_token).await {
                Ok(session) => Ok(Some(session)),
                Err(err) => {
                    tracing::warn!("[SupabaseAuth] session refresh failed: {}", err);
                    self.discard_local().await;
                    Ok(None)
                }
            };
        }

        self.session.set(stored.clone()).await;
        self.emit(AuthEvent::signed_in(stored.clone()));
        Ok(Some(stored))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<AuthSession, AuthError> {
        let session = self
            .token_request(
                "password",
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        tracing::info!("[SupabaseAuth] signed in user {}", session.user_id);
        self.persist(&session).await;
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SessionMetadata,
    ) -> std::result::Result<(), AuthError> {
        let response = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.config.anon_key)
            .json(&SignUpRequest {
                email,
                password,
                data: &metadata,
            })
            .send()
            .await
            .map_err(|err| AuthError::new(format!("auth request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(auth_error_from_response(status.as_u16(), &body_text));
        }

        // Confirmation is asynchronous; no usable session comes back.
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(token) = self.session.access_token().await {
            let result = self
                .client
                .post(self.auth_url("logout"))
                .header("apikey", &self.config.anon_key)
                .bearer_auth(&token)
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(
                        "[SupabaseAuth] remote sign-out returned {}",
                        response.status()
                    );
                }
                Err(err) => tracing::warn!("[SupabaseAuth] remote sign-out failed: {}", err),
                _ => {}
            }
        }

        // Local state is cleared whether or not the remote call landed.
        self.discard_local().await;
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut registry = self
                .subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let id = registry.next_id;
            registry.next_id += 1;
            registry.senders.push((id, sender));
            id
        };

        let registry = Arc::downgrade(&self.subscribers);
        AuthSubscription::new(receiver, move || {
            if let Some(registry) = registry.upgrade() {
                let mut registry = registry
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                registry.senders.retain(|(sender_id, _)| *sender_id != id);
            }
        })
    }
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a SessionMetadata,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserPayload {
    id: uuid::Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: MetadataPayload,
}

#[derive(Deserialize, Default)]
struct MetadataPayload {
    full_name: Option<String>,
    role: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));

        let role = match self.user.user_metadata.role.as_deref() {
            Some(raw) => match UserRole::from_str(raw) {
                Ok(role) => Some(role),
                Err(_) => {
                    tracing::warn!("[SupabaseAuth] unrecognized role '{}' in user metadata", raw);
                    None
                }
            },
            None => None,
        };

        AuthSession {
            user_id: self.user.id,
            email: self.user.email,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            metadata: SessionMetadata {
                full_name: self.user.user_metadata.full_name,
                role,
            },
        }
    }
}

/// Error shapes the auth endpoints return, old and new.
#[derive(Deserialize, Default)]
struct AuthErrorBody {
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

fn auth_error_from_response(status: u16, body: &str) -> AuthError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .msg
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("authentication failed with status {status}")
            } else {
                trimmed.to_string()
            }
        });
    AuthError::new(message).with_status(status)
}
